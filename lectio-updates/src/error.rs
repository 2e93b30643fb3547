//! Update engine error types.

use thiserror::Error;

/// Result type for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Errors that can occur while checking for or applying updates.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update server error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("manifest was built for version {got}, store is at {expected}")]
    VersionMismatch { expected: i64, got: i64 },

    #[error(transparent)]
    Delta(#[from] lectio_delta::DeltaError),

    #[error("store error: {0}")]
    Store(#[from] lectio_store::StoreError),

    #[error("background worker failed: {0}")]
    Worker(String),

    #[error("update scheduler is not running")]
    SchedulerStopped,

    #[error("invalid configuration: {0}")]
    Config(String),
}
