//! Identifier policy: which tables and columns a delta may reference.
//!
//! Table and column names cannot be bound as statement parameters, so they
//! are the injection surface of a remotely supplied manifest. Every name must
//! match a restrictive grammar, and tables must additionally be members of a
//! closed set.

use crate::error::{DeltaError, DeltaResult, ValidationIssue};
use crate::types::{ChangeDescriptor, ColumnMap, Operation, SqlValue};
use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Maximum identifier length, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

static IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").ok());

/// Tables of the embedded dataset that published deltas may modify.
const BUNDLED_TABLES: &[&str] = &[
    "bible_books",
    "bible_verses",
    "cross_references",
    "translations",
    "reading_plans",
    "reading_plan_days",
];

/// Lowercase letter first, then lowercase letters, digits or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER
        .as_ref()
        .is_some_and(|re| name.len() <= MAX_IDENTIFIER_LEN && re.is_match(name))
}

/// Closed set of table names a delta may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowlist {
    tables: BTreeSet<String>,
}

impl Allowlist {
    /// Build an allowlist from explicit table names.
    ///
    /// Every entry must itself satisfy the identifier grammar.
    pub fn new<I, S>(tables: I) -> DeltaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for table in tables {
            let table = table.into();
            if !is_valid_identifier(&table) {
                return Err(DeltaError::InvalidAllowlist(table));
            }
            set.insert(table);
        }
        Ok(Self { tables: set })
    }

    /// The tables of the dataset shipped with the app.
    pub fn bundled() -> Self {
        Self {
            tables: BUNDLED_TABLES.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn is_allowed_table(&self, name: &str) -> bool {
        is_valid_identifier(name) && self.tables.contains(name)
    }

    pub fn is_allowed_column(&self, name: &str) -> bool {
        is_valid_identifier(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }
}

impl Default for Allowlist {
    fn default() -> Self {
        Self::bundled()
    }
}

/// Check one descriptor against the allowlist and its operation's shape.
///
/// `index` is the descriptor's position in its manifest and is carried into
/// the error so the offending change can be located.
pub fn validate_change(
    allowlist: &Allowlist,
    index: usize,
    change: &ChangeDescriptor,
) -> DeltaResult<()> {
    let reject = |issue: ValidationIssue| DeltaError::Validation {
        index,
        issue,
        change: Box::new(change.clone()),
    };

    if !allowlist.is_allowed_table(&change.table) {
        return Err(reject(ValidationIssue::DisallowedTable(change.table.clone())));
    }

    let op = change.operation.as_str();
    match change.operation {
        Operation::Insert => {
            if change.payload.is_empty() {
                return Err(reject(ValidationIssue::MissingPayload(op)));
            }
        }
        Operation::Update => {
            if change.predicate.is_empty() {
                return Err(reject(ValidationIssue::MissingPredicate(op)));
            }
            if change.payload.is_empty() {
                return Err(reject(ValidationIssue::MissingPayload(op)));
            }
        }
        Operation::Delete => {
            if change.predicate.is_empty() {
                return Err(reject(ValidationIssue::MissingPredicate(op)));
            }
        }
        Operation::Unsupported => return Err(reject(ValidationIssue::UnsupportedOperation)),
    }

    check_columns(allowlist, &change.predicate).map_err(&reject)?;
    check_columns(allowlist, &change.payload).map_err(&reject)?;
    Ok(())
}

fn check_columns(allowlist: &Allowlist, columns: &ColumnMap) -> Result<(), ValidationIssue> {
    for (name, value) in columns {
        if !allowlist.is_allowed_column(name) {
            return Err(ValidationIssue::DisallowedColumn(name.clone()));
        }
        if let SqlValue::Real(r) = value {
            if !r.is_finite() {
                return Err(ValidationIssue::NonFiniteValue(name.clone()));
            }
        }
    }
    Ok(())
}
