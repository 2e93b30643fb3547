//! Error types for manifest authoring.

use thiserror::Error;

pub type AuthorResult<T> = Result<T, AuthorError>;

#[derive(Debug, Error)]
pub enum AuthorError {
    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no changes specified")]
    NoChanges,

    #[error(transparent)]
    Delta(#[from] lectio_delta::DeltaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
