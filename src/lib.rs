//! matchpool
//!
//! A multi-region player matchmaking service for competitive 2v2 play:
//! per-region waiting queues over a durable store, a periodic matcher that
//! claims queued players under lock-or-skip row locks and forms balanced
//! teams, and an idempotent result applier driving a TrueSkill-style
//! Bayesian rating update.
//!
//! # Quick Start
//!
//! ```rust
//! use matchpool::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> matchpool::Result<()> {
//!     // In-memory store; production uses PgStore over Postgres.
//!     let store: Arc<dyn MatchStore> = Arc::new(MemoryStore::new());
//!
//!     // Register a player and declare intent to play.
//!     let rating = TrueSkill::default().default_rating();
//!     store
//!         .create_player(&Player {
//!             player_id: "p1".to_string(),
//!             username: "Akame".to_string(),
//!             region: Region::EUW,
//!             mu: rating.mu,
//!             sigma: rating.sigma,
//!             last_active: Utc::now(),
//!         })
//!         .await?;
//!     store.enqueue("p1", None).await?;
//!
//!     // The periodic matcher drains the queue four players at a time.
//!     let runner = MatcherRunner::new(
//!         store.clone(),
//!         vec![Region::EUW],
//!         0.1,
//!         Duration::from_millis(200),
//!     );
//!     let report = runner.run_tick().await;
//!     assert_eq!(report.matches_created, 0); // a match needs four players
//!
//!     Ok(())
//! }
//! ```

pub mod applier;
pub mod config;
pub mod error;
pub mod http;
pub mod matcher;
pub mod model;
pub mod rating;
pub mod region;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use applier::{ResultApplier, ResultDispatcher};
pub use config::Config;
pub use error::{MatchPoolError, Result};
pub use http::{router, AppState, AuthConfig};
pub use matcher::{MatcherRunner, SplitPlanner, TickReport};
pub use model::{
    ApplyOutcome, DequeueOutcome, EnqueueReceipt, MatchRecord, MatchStatus, Player, QueueEntry,
    QueueStatus, ReportReceipt, Roster, RosterMember, Team,
};
pub use rating::{Rating, TrueSkill};
pub use region::Region;
pub use store::{MatchStore, MemoryStore, PgStore};

/// Prelude module for convenient imports
pub mod prelude;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
