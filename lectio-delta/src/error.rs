//! Error types for delta validation and application.

use crate::types::ChangeDescriptor;
use thiserror::Error;

/// Why a single change descriptor was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("table not allowed: {0}")]
    DisallowedTable(String),

    #[error("column not allowed: {0}")]
    DisallowedColumn(String),

    #[error("{0} requires a non-empty predicate")]
    MissingPredicate(&'static str),

    #[error("{0} requires a non-empty payload")]
    MissingPayload(&'static str),

    #[error("unsupported operation")]
    UnsupportedOperation,

    #[error("non-finite number in column {0}")]
    NonFiniteValue(String),
}

/// All errors that can occur while validating or applying a delta.
#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("invalid change #{index} ({change}): {issue}")]
    Validation {
        index: usize,
        issue: ValidationIssue,
        change: Box<ChangeDescriptor>,
    },

    #[error("invalid allowlist entry: {0}")]
    InvalidAllowlist(String),

    #[error("change #{index} on {table} failed: {source}")]
    Transaction {
        index: usize,
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeltaError {
    /// The validation issue, if this is a validation failure.
    pub fn validation_issue(&self) -> Option<&ValidationIssue> {
        match self {
            Self::Validation { issue, .. } => Some(issue),
            _ => None,
        }
    }
}

pub type DeltaResult<T> = Result<T, DeltaError>;
