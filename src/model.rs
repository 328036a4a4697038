use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::MatchPoolError;
use crate::region::Region;

/// A registered player and their current posterior skill.
///
/// `mu`/`sigma` are mutated only by the result applier; everything else is
/// written at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub username: String,
    pub region: Region,
    pub mu: f64,
    pub sigma: f64,
    pub last_active: DateTime<Utc>,
}

impl Player {
    /// Conservative skill estimate used for leaderboard ordering.
    pub fn conservative_rating(&self) -> f64 {
        self.mu - 3.0 * self.sigma
    }
}

/// A player's entry in the matchmaking queue.
///
/// At most one entry exists per player. Region and skill are snapshotted from
/// the player row at enqueue time; the applier later re-reads live ratings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub player_id: String,
    pub enqueued_at: DateTime<Utc>,
    pub region: Region,
    pub mu: f64,
    pub sigma: f64,
    /// Opaque matching constraints. Accepted and preserved, not yet consulted.
    pub constraints: Option<Value>,
}

/// One side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[serde(rename = "teamA")]
    A,
    #[serde(rename = "teamB")]
    B,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::A => "teamA",
            Team::B => "teamB",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = MatchPoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teamA" => Ok(Team::A),
            "teamB" => Ok(Team::B),
            other => Err(MatchPoolError::OperationFailed(format!(
                "invalid team tag: {other}"
            ))),
        }
    }
}

/// Match lifecycle. `Finished` is terminal; transitions never go backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Reporting,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Reporting => "reporting",
            MatchStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = MatchPoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "reporting" => Ok(MatchStatus::Reporting),
            "finished" => Ok(MatchStatus::Finished),
            other => Err(MatchPoolError::OperationFailed(format!(
                "invalid match status: {other}"
            ))),
        }
    }
}

/// A roster slot captured at match-formation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterMember {
    pub player_id: String,
    pub mu: f64,
    pub sigma: f64,
}

/// The two teams of a match, in the JSON shape persisted to the store:
/// `{"teamA":[{player_id,mu,sigma}, ..],"teamB":[..]}`, two members per team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Roster {
    #[serde(rename = "teamA")]
    pub team_a: Vec<RosterMember>,
    #[serde(rename = "teamB")]
    pub team_b: Vec<RosterMember>,
}

impl Roster {
    pub fn team(&self, team: Team) -> &[RosterMember] {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    /// All four player ids, team A first.
    pub fn player_ids(&self) -> Vec<String> {
        self.team_a
            .iter()
            .chain(self.team_b.iter())
            .map(|m| m.player_id.clone())
            .collect()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.team_a
            .iter()
            .chain(self.team_b.iter())
            .any(|m| m.player_id == player_id)
    }
}

/// A formed match as stored and served over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: Uuid,
    #[serde(rename = "players")]
    pub roster: Roster,
    pub region: Region,
    pub quality: f64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

/// The insert-once result row for a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub match_id: Uuid,
    pub winner_team: Team,
    pub reported_at: DateTime<Utc>,
}

/// Response to a successful enqueue.
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueReceipt {
    pub status: &'static str,
    pub player_id: String,
    pub region: Region,
}

impl EnqueueReceipt {
    pub fn new(player_id: String, region: Region) -> Self {
        Self {
            status: "enqueued",
            player_id,
            region,
        }
    }
}

/// Outcome of a dequeue. Removing an absent entry is not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DequeueOutcome {
    Dequeued { player_id: String },
    NotFound { player_id: String },
}

/// A player's current queue membership.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub player_id: String,
    pub enqueued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enqueued_at: Option<DateTime<Utc>>,
}

impl QueueStatus {
    pub fn absent(player_id: String) -> Self {
        Self {
            player_id,
            enqueued: false,
            region: None,
            enqueued_at: None,
        }
    }
}

/// Queue depth for one region.
#[derive(Debug, Clone, Serialize)]
pub struct RegionDepth {
    pub region: Region,
    pub depth: i64,
}

/// Acknowledgement that a result report was recorded and handed to the
/// applier.
#[derive(Debug, Clone, Serialize)]
pub struct ReportReceipt {
    pub status: &'static str,
    pub match_id: Uuid,
    pub winner_team: Team,
}

impl ReportReceipt {
    pub fn queued(match_id: Uuid, winner_team: Team) -> Self {
        Self {
            status: "queued",
            match_id,
            winner_team,
        }
    }
}

/// Terminal outcome of one result application.
///
/// `NoMatch` and `AlreadyFinished` are non-error tags so duplicate or stale
/// deliveries stay silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum ApplyOutcome {
    #[serde(rename = "ok")]
    Applied { match_id: Uuid, winner_team: Team },
    #[serde(rename = "no-match")]
    NoMatch { match_id: Uuid },
    #[serde(rename = "already-finished")]
    AlreadyFinished { match_id: Uuid },
}

/// One leaderboard line, ordered by conservative rating.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub username: String,
    pub mu: f64,
    pub sigma: f64,
    pub conservative_rating: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> RosterMember {
        RosterMember {
            player_id: id.to_string(),
            mu: 25.0,
            sigma: 8.333,
        }
    }

    #[test]
    fn roster_round_trips_wire_shape() {
        let roster = Roster {
            team_a: vec![member("p1"), member("p2")],
            team_b: vec![member("p3"), member("p4")],
        };
        let value = serde_json::to_value(&roster).unwrap();
        assert!(value.get("teamA").is_some());
        assert!(value.get("teamB").is_some());
        let back: Roster = serde_json::from_value(value).unwrap();
        assert_eq!(back, roster);
        assert_eq!(back.player_ids(), vec!["p1", "p2", "p3", "p4"]);
        assert!(back.contains("p3"));
        assert!(!back.contains("p9"));
    }

    #[test]
    fn team_tags_match_the_wire() {
        assert_eq!(serde_json::to_string(&Team::A).unwrap(), "\"teamA\"");
        assert_eq!("teamB".parse::<Team>().unwrap(), Team::B);
        assert!("teamC".parse::<Team>().is_err());
    }

    #[test]
    fn status_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&MatchStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            "finished".parse::<MatchStatus>().unwrap(),
            MatchStatus::Finished
        );
    }

    #[test]
    fn apply_outcome_tags() {
        let id = Uuid::nil();
        let out = serde_json::to_value(ApplyOutcome::AlreadyFinished { match_id: id }).unwrap();
        assert_eq!(out["status"], "already-finished");
        let out = serde_json::to_value(ApplyOutcome::Applied {
            match_id: id,
            winner_team: Team::A,
        })
        .unwrap();
        assert_eq!(out["status"], "ok");
        assert_eq!(out["winner_team"], "teamA");
    }

    #[test]
    fn conservative_rating_is_mu_minus_three_sigma() {
        let player = Player {
            player_id: "p1".into(),
            username: "Esdeath".into(),
            region: Region::EUW,
            mu: 25.0,
            sigma: 8.0,
            last_active: Utc::now(),
        };
        assert!((player.conservative_rating() - 1.0).abs() < 1e-9);
    }
}
