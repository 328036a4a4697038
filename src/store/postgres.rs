use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::traits::MatchStore;
use crate::error::{MatchPoolError, Result};
use crate::matcher::split::{Candidate, MATCH_SIZE};
use crate::matcher::SplitPlanner;
use crate::model::{
    ApplyOutcome, DequeueOutcome, EnqueueReceipt, LeaderboardRow, MatchRecord, MatchStatus, Player,
    QueueStatus, RegionDepth, ReportReceipt, ResultRecord, Roster, Team,
};
use crate::rating::{Rating, TrueSkill};
use crate::region::Region;

/// Postgres-backed store.
///
/// The production persistence layer. Matcher claims rely on
/// `FOR UPDATE SKIP LOCKED`, so any number of worker processes can drain the
/// same region without handing out a queue row twice.
pub struct PgStore {
    pool: PgPool,
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    DO $$ BEGIN
        CREATE TYPE regions_enum AS ENUM
            ('EUW','EUNE','NA','CHN','JPN','KR','OCE','BR','LAS','LAN');
    EXCEPTION WHEN duplicate_object THEN NULL;
    END $$
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS players (
        player_id   TEXT PRIMARY KEY,
        username    TEXT NOT NULL,
        region      regions_enum NOT NULL,
        mu          DOUBLE PRECISION NOT NULL,
        sigma       DOUBLE PRECISION NOT NULL,
        last_active TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS queue (
        player_id   TEXT PRIMARY KEY REFERENCES players(player_id),
        enqueued_at TIMESTAMPTZ NOT NULL,
        region      regions_enum NOT NULL,
        mu          DOUBLE PRECISION NOT NULL,
        sigma       DOUBLE PRECISION NOT NULL,
        constraints JSONB
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_queue_region_enqueued ON queue(region, enqueued_at)",
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        match_id   UUID PRIMARY KEY,
        players    JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        region     regions_enum NOT NULL,
        quality    DOUBLE PRECISION,
        status     TEXT NOT NULL DEFAULT 'pending'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_matches_created_at ON matches(created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS results (
        match_id    UUID PRIMARY KEY REFERENCES matches(match_id),
        winner_team TEXT NOT NULL,
        reported_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

impl PgStore {
    /// Connect with the store-operation deadline applied to pool acquires.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .acquire_timeout(Duration::from_secs(5))
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the schema, retrying while the database cold-starts.
    pub async fn ensure_schema(&self, max_tries: u32, delay: Duration) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.init_schema().await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < max_tries && err.is_transient() => {
                    tracing::warn!(attempt, %err, "schema init failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn init_schema(&self) -> Result<()> {
        for &statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn player_from_row(row: &PgRow) -> Result<Player> {
        Ok(Player {
            player_id: row.try_get("player_id")?,
            username: row.try_get("username")?,
            region: row.try_get("region")?,
            mu: row.try_get("mu")?,
            sigma: row.try_get("sigma")?,
            last_active: row.try_get("last_active")?,
        })
    }

    fn match_from_row(row: &PgRow) -> Result<MatchRecord> {
        let roster: Roster = serde_json::from_value(row.try_get::<Value, _>("players")?)?;
        let status: MatchStatus = row.try_get::<String, _>("status")?.parse()?;
        Ok(MatchRecord {
            match_id: row.try_get("match_id")?,
            roster,
            region: row.try_get("region")?,
            quality: row.try_get::<Option<f64>, _>("quality")?.unwrap_or(0.0),
            status,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn create_player(&self, player: &Player) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO players (player_id, username, region, mu, sigma, last_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (player_id) DO NOTHING
            "#,
        )
        .bind(&player.player_id)
        .bind(&player.username)
        .bind(player.region)
        .bind(player.mu)
        .bind(player.sigma)
        .bind(player.last_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_player(&self, player_id: &str) -> Result<Option<Player>> {
        let row = sqlx::query(
            "SELECT player_id, username, region, mu, sigma, last_active \
             FROM players WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::player_from_row(&r)).transpose()
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardRow>> {
        let rows = sqlx::query(
            r#"
            SELECT username, mu, sigma, (mu - 3 * sigma) AS cr
            FROM players
            ORDER BY cr DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(LeaderboardRow {
                    username: row.try_get("username")?,
                    mu: row.try_get("mu")?,
                    sigma: row.try_get("sigma")?,
                    conservative_rating: row.try_get("cr")?,
                })
            })
            .collect()
    }

    async fn enqueue(
        &self,
        player_id: &str,
        constraints: Option<Value>,
    ) -> Result<EnqueueReceipt> {
        let mut tx = self.pool.begin().await?;

        let player = sqlx::query("SELECT region, mu, sigma FROM players WHERE player_id = $1")
            .bind(player_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(player) = player else {
            return Err(MatchPoolError::PlayerNotFound(player_id.to_string()));
        };

        let region: Region = player.try_get("region")?;
        let mu: f64 = player.try_get("mu")?;
        let sigma: f64 = player.try_get("sigma")?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO queue (player_id, enqueued_at, region, mu, sigma, constraints)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (player_id) DO UPDATE SET
                enqueued_at = EXCLUDED.enqueued_at,
                region      = EXCLUDED.region,
                mu          = EXCLUDED.mu,
                sigma       = EXCLUDED.sigma,
                constraints = EXCLUDED.constraints
            "#,
        )
        .bind(player_id)
        .bind(now)
        .bind(region)
        .bind(mu)
        .bind(sigma)
        .bind(constraints)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(EnqueueReceipt::new(player_id.to_string(), region))
    }

    async fn dequeue(&self, player_id: &str) -> Result<DequeueOutcome> {
        let result = sqlx::query("DELETE FROM queue WHERE player_id = $1")
            .bind(player_id)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() > 0 {
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
        let row = sqlx::query("SELECT region, enqueued_at FROM queue WHERE player_id = $1")
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Ok(QueueStatus::absent(player_id.to_string())),
            Some(row) => Ok(QueueStatus {
                player_id: player_id.to_string(),
                enqueued: true,
                region: Some(row.try_get("region")?),
                enqueued_at: Some(row.try_get("enqueued_at")?),
            }),
        }
    }

    async fn queue_depths(&self) -> Result<Vec<RegionDepth>> {
        let rows = sqlx::query(
            "SELECT region, COUNT(*) AS depth FROM queue GROUP BY region ORDER BY region",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RegionDepth {
                    region: row.try_get("region")?,
                    depth: row.try_get("depth")?,
                })
            })
            .collect()
    }

    async fn drain_region(
        &self,
        region: Region,
        planner: &SplitPlanner,
    ) -> Result<Vec<MatchRecord>> {
        let mut tx = self.pool.begin().await?;
        let mut formed = Vec::new();

        loop {
            // Oldest four for this region; rows locked by another worker's
            // in-flight transaction are skipped, not waited on.
            let rows = sqlx::query(
                r#"
                SELECT player_id, mu, sigma
                FROM queue
                WHERE region = $1
                ORDER BY enqueued_at
                LIMIT 4
                FOR UPDATE SKIP LOCKED
                "#,
            )
            .bind(region)
            .fetch_all(&mut *tx)
            .await?;

            if rows.len() < MATCH_SIZE {
                break;
            }

            let four = rows
                .iter()
                .map(|row| {
                    Ok(Candidate {
                        player_id: row.try_get("player_id")?,
                        mu: row.try_get("mu")?,
                        sigma: row.try_get("sigma")?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let plan = planner.plan(&four);
            let record = MatchRecord {
                match_id: Uuid::new_v4(),
                roster: plan.roster,
                region,
                quality: plan.quality,
                status: MatchStatus::Pending,
                created_at: Utc::now(),
            };

            sqlx::query(
                r#"
                INSERT INTO matches (match_id, players, created_at, region, quality, status)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(record.match_id)
            .bind(serde_json::to_value(&record.roster)?)
            .bind(record.created_at)
            .bind(record.region)
            .bind(record.quality)
            .bind(record.status.as_str())
            .execute(&mut *tx)
            .await?;

            let ids = record.roster.player_ids();
            sqlx::query("DELETE FROM queue WHERE player_id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;

            formed.push(record);
        }

        tx.commit().await?;
        Ok(formed)
    }

    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchRecord>> {
        let row = sqlx::query(
            "SELECT match_id, players, created_at, region, quality, status \
             FROM matches WHERE match_id = $1",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::match_from_row(&r)).transpose()
    }

    async fn latest_matches(&self, limit: i64) -> Result<Vec<MatchRecord>> {
        let rows = sqlx::query(
            "SELECT match_id, players, created_at, region, quality, status \
             FROM matches ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::match_from_row).collect()
    }

    async fn record_report(&self, match_id: Uuid, winner_team: Team) -> Result<ReportReceipt> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT match_id FROM matches WHERE match_id = $1 FOR UPDATE")
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?;
        if row.is_none() {
            return Err(MatchPoolError::MatchNotFound(match_id));
        }

        sqlx::query(
            r#"
            INSERT INTO results (match_id, winner_team, reported_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (match_id) DO NOTHING
            "#,
        )
        .bind(match_id)
        .bind(winner_team.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        // Guarded so a finished match never regresses.
        sqlx::query("UPDATE matches SET status = 'reporting' WHERE match_id = $1 AND status = 'pending'")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ReportReceipt::queued(match_id, winner_team))
    }

    async fn get_result(&self, match_id: Uuid) -> Result<Option<ResultRecord>> {
        let row = sqlx::query(
            "SELECT match_id, winner_team, reported_at FROM results WHERE match_id = $1",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(ResultRecord {
                match_id: row.try_get("match_id")?,
                winner_team: row.try_get::<String, _>("winner_team")?.parse()?,
                reported_at: row.try_get("reported_at")?,
            })
        })
        .transpose()
    }

    async fn apply_result(
        &self,
        match_id: Uuid,
        winner_team: Team,
        env: &TrueSkill,
    ) -> Result<ApplyOutcome> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE serializes concurrent applications to the same match;
        // the loser of the race observes `finished` below.
        let row = sqlx::query("SELECT players, status FROM matches WHERE match_id = $1 FOR UPDATE")
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(ApplyOutcome::NoMatch { match_id });
        };

        let status: MatchStatus = row.try_get::<String, _>("status")?.parse()?;
        if status == MatchStatus::Finished {
            return Ok(ApplyOutcome::AlreadyFinished { match_id });
        }

        let roster: Roster = serde_json::from_value(row.try_get::<Value, _>("players")?)?;
        let ids = roster.player_ids();

        // Live ratings, not the roster snapshots: skill may have drifted
        // since match formation.
        let rows = sqlx::query("SELECT player_id, mu, sigma FROM players WHERE player_id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;
        let mut live: HashMap<String, Rating> = HashMap::with_capacity(rows.len());
        for row in &rows {
            live.insert(
                row.try_get("player_id")?,
                Rating::new(row.try_get("mu")?, row.try_get("sigma")?),
            );
        }

        let team_ratings = |team: Team| -> Result<Vec<Rating>> {
            roster
                .team(team)
                .iter()
                .map(|m| {
                    live.get(&m.player_id)
                        .copied()
                        .ok_or_else(|| MatchPoolError::PlayerNotFound(m.player_id.clone()))
                })
                .collect()
        };

        let (winner_ids, loser_ids, winner_ratings, loser_ratings) = match winner_team {
            Team::A => (
                roster.team(Team::A),
                roster.team(Team::B),
                team_ratings(Team::A)?,
                team_ratings(Team::B)?,
            ),
            Team::B => (
                roster.team(Team::B),
                roster.team(Team::A),
                team_ratings(Team::B)?,
                team_ratings(Team::A)?,
            ),
        };

        let (new_winners, new_losers) = env.rate_two_teams(&winner_ratings, &loser_ratings);
        let now = Utc::now();

        for (member, rating) in winner_ids
            .iter()
            .zip(&new_winners)
            .chain(loser_ids.iter().zip(&new_losers))
        {
            sqlx::query(
                "UPDATE players SET mu = $1, sigma = $2, last_active = $3 WHERE player_id = $4",
            )
            .bind(rating.mu)
            .bind(rating.sigma)
            .bind(now)
            .bind(&member.player_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE matches SET status = 'finished' WHERE match_id = $1")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO results (match_id, winner_team, reported_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (match_id) DO NOTHING
            "#,
        )
        .bind(match_id)
        .bind(winner_team.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ApplyOutcome::Applied {
            match_id,
            winner_team,
        })
    }
}
