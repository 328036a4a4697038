use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MatchPoolError {
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Match not found: {0}")]
    MatchNotFound(Uuid),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl MatchPoolError {
    /// Transient store failures are retried by the next tick or redelivery
    /// instead of being surfaced as terminal outcomes.
    pub fn is_transient(&self) -> bool {
        matches!(self, MatchPoolError::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, MatchPoolError>;
