use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::matcher::SplitPlanner;
use crate::model::{
    ApplyOutcome, DequeueOutcome, EnqueueReceipt, LeaderboardRow, MatchRecord, Player, QueueStatus,
    RegionDepth, ReportReceipt, ResultRecord, Team,
};
use crate::rating::TrueSkill;
use crate::region::Region;

/// The durable store behind the matchmaking core.
///
/// Every method is one short transaction; nothing transactional leaks past
/// the trait boundary. The multi-step operations (`drain_region`,
/// `apply_result`) take the pure core logic as an argument and run it between
/// their reads and writes, so concurrency control stays entirely inside the
/// implementation.
#[async_trait]
pub trait MatchStore: Send + Sync {
    // Players
    /// Insert a player if absent; an existing row is left untouched.
    async fn create_player(&self, player: &Player) -> Result<()>;
    async fn get_player(&self, player_id: &str) -> Result<Option<Player>>;
    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardRow>>;

    // Queue
    /// Upsert the player's queue entry, snapshotting region and skill.
    /// Re-enqueueing resets `enqueued_at` (back of the line).
    async fn enqueue(&self, player_id: &str, constraints: Option<Value>)
        -> Result<EnqueueReceipt>;
    async fn dequeue(&self, player_id: &str) -> Result<DequeueOutcome>;
    async fn queue_status(&self, player_id: &str) -> Result<QueueStatus>;
    async fn queue_depths(&self) -> Result<Vec<RegionDepth>>;

    // Matches
    /// One matcher transaction for one region: repeatedly claim the four
    /// oldest entries (lock-or-skip), split them, insert the match, and
    /// delete the claimed rows. Returns the matches formed.
    async fn drain_region(
        &self,
        region: Region,
        planner: &SplitPlanner,
    ) -> Result<Vec<MatchRecord>>;
    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchRecord>>;
    async fn latest_matches(&self, limit: i64) -> Result<Vec<MatchRecord>>;

    // Results
    /// Record report intent: insert-once result row, move a `pending` match
    /// to `reporting`. Fails with `MatchNotFound` for unknown matches.
    async fn record_report(&self, match_id: Uuid, winner_team: Team) -> Result<ReportReceipt>;
    async fn get_result(&self, match_id: Uuid) -> Result<Option<ResultRecord>>;
    /// Apply a reported result: re-read live ratings, run the skill update,
    /// persist new ratings, finish the match. Idempotent per match.
    async fn apply_result(
        &self,
        match_id: Uuid,
        winner_team: Team,
        env: &TrueSkill,
    ) -> Result<ApplyOutcome>;
}
