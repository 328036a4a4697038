use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::traits::MatchStore;
use crate::error::{MatchPoolError, Result};
use crate::matcher::split::{Candidate, MATCH_SIZE};
use crate::matcher::SplitPlanner;
use crate::model::{
    ApplyOutcome, DequeueOutcome, EnqueueReceipt, LeaderboardRow, MatchRecord, MatchStatus, Player,
    QueueEntry, QueueStatus, RegionDepth, ReportReceipt, ResultRecord, Team,
};
use crate::rating::{Rating, TrueSkill};
use crate::region::Region;

struct QueueSlot {
    entry: QueueEntry,
    /// Breaks `enqueued_at` ties so claim order stays deterministic.
    seq: u64,
}

#[derive(Default)]
struct Inner {
    players: HashMap<String, Player>,
    queue: HashMap<String, QueueSlot>,
    matches: HashMap<Uuid, MatchRecord>,
    results: HashMap<Uuid, ResultRecord>,
    next_seq: u64,
}

/// In-memory store (for development/testing).
///
/// A single lock plays the role of the database's transactions: every trait
/// method runs to completion under it, which trivially gives the same
/// atomicity and serialization the Postgres store gets from row locks.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn claim_four(&mut self, region: Region) -> Option<Vec<Candidate>> {
        let mut slots: Vec<(&String, &QueueSlot)> = self
            .queue
            .iter()
            .filter(|(_, slot)| slot.entry.region == region)
            .collect();
        if slots.len() < MATCH_SIZE {
            return None;
        }
        slots.sort_by(|(_, a), (_, b)| {
            a.entry
                .enqueued_at
                .cmp(&b.entry.enqueued_at)
                .then(a.seq.cmp(&b.seq))
        });

        let ids: Vec<String> = slots[..MATCH_SIZE]
            .iter()
            .map(|(id, _)| (*id).clone())
            .collect();
        let four = ids
            .iter()
            .map(|id| {
                let slot = self.queue.remove(id).expect("claimed entry exists");
                Candidate {
                    player_id: slot.entry.player_id,
                    mu: slot.entry.mu,
                    sigma: slot.entry.sigma,
                }
            })
            .collect();
        Some(four)
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create_player(&self, player: &Player) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .players
            .entry(player.player_id.clone())
            .or_insert_with(|| player.clone());
        Ok(())
    }

    async fn get_player(&self, player_id: &str) -> Result<Option<Player>> {
        let inner = self.inner.lock().await;
        Ok(inner.players.get(player_id).cloned())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardRow>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<LeaderboardRow> = inner
            .players
            .values()
            .map(|p| LeaderboardRow {
                username: p.username.clone(),
                mu: p.mu,
                sigma: p.sigma,
                conservative_rating: p.conservative_rating(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.conservative_rating
                .partial_cmp(&a.conservative_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn enqueue(
        &self,
        player_id: &str,
        constraints: Option<Value>,
    ) -> Result<EnqueueReceipt> {
        let mut inner = self.inner.lock().await;
        let player = inner
            .players
            .get(player_id)
            .ok_or_else(|| MatchPoolError::PlayerNotFound(player_id.to_string()))?;

        let entry = QueueEntry {
            player_id: player_id.to_string(),
            enqueued_at: Utc::now(),
            region: player.region,
            mu: player.mu,
            sigma: player.sigma,
            constraints,
        };
        let region = entry.region;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .queue
            .insert(player_id.to_string(), QueueSlot { entry, seq });

        Ok(EnqueueReceipt::new(player_id.to_string(), region))
    }

    async fn dequeue(&self, player_id: &str) -> Result<DequeueOutcome> {
        let mut inner = self.inner.lock().await;
        Ok(if inner.queue.remove(player_id).is_some() {
            DequeueOutcome::Dequeued {
                player_id: player_id.to_string(),
            }
        } else {
            DequeueOutcome::NotFound {
                player_id: player_id.to_string(),
            }
        })
    }

    async fn queue_status(&self, player_id: &str) -> Result<QueueStatus> {
        let inner = self.inner.lock().await;
        Ok(match inner.queue.get(player_id) {
            None => QueueStatus::absent(player_id.to_string()),
            Some(slot) => QueueStatus {
                player_id: player_id.to_string(),
                enqueued: true,
                region: Some(slot.entry.region),
                enqueued_at: Some(slot.entry.enqueued_at),
            },
        })
    }

    async fn queue_depths(&self) -> Result<Vec<RegionDepth>> {
        let inner = self.inner.lock().await;
        let mut counts: HashMap<Region, i64> = HashMap::new();
        for slot in inner.queue.values() {
            *counts.entry(slot.entry.region).or_default() += 1;
        }
        Ok(Region::ALL
            .iter()
            .filter_map(|region| {
                counts.get(region).map(|&depth| RegionDepth {
                    region: *region,
                    depth,
                })
            })
            .collect())
    }

    async fn drain_region(
        &self,
        region: Region,
        planner: &SplitPlanner,
    ) -> Result<Vec<MatchRecord>> {
        let mut inner = self.inner.lock().await;
        let mut formed = Vec::new();

        while let Some(four) = inner.claim_four(region) {
            let plan = planner.plan(&four);
            let record = MatchRecord {
                match_id: Uuid::new_v4(),
                roster: plan.roster,
                region,
                quality: plan.quality,
                status: MatchStatus::Pending,
                created_at: Utc::now(),
            };
            inner.matches.insert(record.match_id, record.clone());
            formed.push(record);
        }

        Ok(formed)
    }

    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.matches.get(&match_id).cloned())
    }

    async fn latest_matches(&self, limit: i64) -> Result<Vec<MatchRecord>> {
        let inner = self.inner.lock().await;
        let mut all: Vec<MatchRecord> = inner.matches.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit.max(0) as usize);
        Ok(all)
    }

    async fn record_report(&self, match_id: Uuid, winner_team: Team) -> Result<ReportReceipt> {
        let mut inner = self.inner.lock().await;
        if !inner.matches.contains_key(&match_id) {
            return Err(MatchPoolError::MatchNotFound(match_id));
        }

        inner.results.entry(match_id).or_insert_with(|| ResultRecord {
            match_id,
            winner_team,
            reported_at: Utc::now(),
        });

        let record = inner.matches.get_mut(&match_id).expect("checked above");
        if record.status == MatchStatus::Pending {
            record.status = MatchStatus::Reporting;
        }

        Ok(ReportReceipt::queued(match_id, winner_team))
    }

    async fn get_result(&self, match_id: Uuid) -> Result<Option<ResultRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.results.get(&match_id).cloned())
    }

    async fn apply_result(
        &self,
        match_id: Uuid,
        winner_team: Team,
        env: &TrueSkill,
    ) -> Result<ApplyOutcome> {
        let mut inner = self.inner.lock().await;

        let Some(record) = inner.matches.get(&match_id).cloned() else {
            return Ok(ApplyOutcome::NoMatch { match_id });
        };
        if record.status == MatchStatus::Finished {
            return Ok(ApplyOutcome::AlreadyFinished { match_id });
        }

        let live = |inner: &Inner, team: Team| -> Result<Vec<Rating>> {
            record
                .roster
                .team(team)
                .iter()
                .map(|m| {
                    inner
                        .players
                        .get(&m.player_id)
                        .map(|p| Rating::new(p.mu, p.sigma))
                        .ok_or_else(|| MatchPoolError::PlayerNotFound(m.player_id.clone()))
                })
                .collect()
        };

        let (winner_members, loser_members) = match winner_team {
            Team::A => (record.roster.team(Team::A), record.roster.team(Team::B)),
            Team::B => (record.roster.team(Team::B), record.roster.team(Team::A)),
        };
        let winner_ratings = live(&inner, winner_team)?;
        let loser_ratings = match winner_team {
            Team::A => live(&inner, Team::B)?,
            Team::B => live(&inner, Team::A)?,
        };

        let (new_winners, new_losers) = env.rate_two_teams(&winner_ratings, &loser_ratings);
        let now = Utc::now();

        let updates: Vec<(String, Rating)> = winner_members
            .iter()
            .zip(&new_winners)
            .chain(loser_members.iter().zip(&new_losers))
            .map(|(m, r)| (m.player_id.clone(), *r))
            .collect();
        for (player_id, rating) in updates {
            let player = inner
                .players
                .get_mut(&player_id)
                .ok_or_else(|| MatchPoolError::PlayerNotFound(player_id.clone()))?;
            player.mu = rating.mu;
            player.sigma = rating.sigma;
            player.last_active = now;
        }

        if let Some(record) = inner.matches.get_mut(&match_id) {
            record.status = MatchStatus::Finished;
        }
        inner.results.entry(match_id).or_insert_with(|| ResultRecord {
            match_id,
            winner_team,
            reported_at: now,
        });

        Ok(ApplyOutcome::Applied {
            match_id,
            winner_team,
        })
    }
}
