//! Core data types for change descriptors.

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A primitive value bound into a statement parameter.
///
/// Deserializes from plain JSON scalars. Arrays and objects are rejected by
/// the deserializer, so structured values never reach the statement builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            Self::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Column name to value. Ordered so generated SQL is deterministic.
pub type ColumnMap = BTreeMap<String, SqlValue>;

/// Mutation kind carried by a change descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
    /// Any operation name this build does not know. Rejected at validation.
    #[serde(other)]
    Unsupported,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unsupported => "unsupported",
        }
    }

    /// Parse an operation name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One insert, update or delete against one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    pub table: String,
    pub operation: Operation,
    #[serde(
        default,
        rename = "where",
        alias = "predicate",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub predicate: ColumnMap,
    #[serde(
        default,
        rename = "data",
        alias = "payload",
        alias = "set",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub payload: ColumnMap,
}

impl ChangeDescriptor {
    pub fn insert(table: impl Into<String>, payload: ColumnMap) -> Self {
        Self {
            table: table.into(),
            operation: Operation::Insert,
            predicate: ColumnMap::new(),
            payload,
        }
    }

    pub fn update(table: impl Into<String>, predicate: ColumnMap, payload: ColumnMap) -> Self {
        Self {
            table: table.into(),
            operation: Operation::Update,
            predicate,
            payload,
        }
    }

    pub fn delete(table: impl Into<String>, predicate: ColumnMap) -> Self {
        Self {
            table: table.into(),
            operation: Operation::Delete,
            predicate,
            payload: ColumnMap::new(),
        }
    }
}

fn write_columns(f: &mut fmt::Formatter<'_>, columns: &ColumnMap) -> fmt::Result {
    for (i, (name, value)) in columns.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{name}={value}")?;
    }
    Ok(())
}

impl fmt::Display for ChangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.table)?;
        if !self.predicate.is_empty() {
            f.write_str(" where ")?;
            write_columns(f, &self.predicate)?;
        }
        if !self.payload.is_empty() {
            f.write_str(" set ")?;
            write_columns(f, &self.payload)?;
        }
        Ok(())
    }
}
