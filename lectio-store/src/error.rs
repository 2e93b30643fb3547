//! Error types for the store.

use thiserror::Error;

/// All errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid stored value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("data version is {found}, expected {expected} before moving to {target}")]
    VersionConflict {
        expected: i64,
        found: i64,
        target: i64,
    },

    #[error("delta error: {0}")]
    Delta(#[from] lectio_delta::DeltaError),
}

pub type StoreResult<T> = Result<T, StoreError>;
