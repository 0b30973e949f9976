//! Error types for triage-rs.
//!
//! Per-item failures (`NotFound`, `Classifier`, `Persistence`) are caught by
//! the batch coordinator and recorded against the item. Whole-operation
//! failures (`Validation`, `GroupingService`, `MalformedResponse`) propagate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("item not found: {0}")]
    NotFound(String),

    #[error("classification failed: {0}")]
    Classifier(String),

    #[error("grouping service failed: {0}")]
    GroupingService(String),

    #[error("malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("batch cancelled: progress consumer disconnected")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error came from an AI capability rather than from the
    /// caller or the store.
    pub fn is_upstream_ai(&self) -> bool {
        matches!(
            self,
            Error::Classifier(_) | Error::GroupingService(_) | Error::MalformedResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
