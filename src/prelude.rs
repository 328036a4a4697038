//! Prelude module with commonly used types and traits
//!
//! Import this module to get all the essential types for using matchpool:
//!
//! ```rust
//! use matchpool::prelude::*;
//! ```

pub use crate::{
    applier::{ResultApplier, ResultDispatcher, ResultJob},
    config::Config,
    error::{MatchPoolError, Result},
    http::{router, ApiKey, AppState, AuthConfig},
    matcher::{Candidate, MatcherRunner, SplitPlan, SplitPlanner, TickReport},
    model::{
        ApplyOutcome, DequeueOutcome, EnqueueReceipt, LeaderboardRow, MatchRecord, MatchStatus,
        Player, QueueEntry, QueueStatus, RegionDepth, ReportReceipt, ResultRecord, Roster,
        RosterMember, Team,
    },
    rating::{Rating, TrueSkill},
    region::Region,
    store::{MatchStore, MemoryStore, PgStore},
};

// Re-export common external dependencies
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
pub use uuid::Uuid;
