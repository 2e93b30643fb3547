//! Delta engine for the embedded Lectio dataset.
//!
//! A delta is an ordered list of [`ChangeDescriptor`]s bundled into an
//! [`UpdateManifest`]. Manifests arrive from a remote service, so every table
//! and column they name is checked against a closed [`Allowlist`] and a strict
//! identifier grammar before any SQL is built. Values are always bound as
//! parameters; identifiers are validated and then quoted.
//!
//! # Architecture
//!
//! - [`allowlist`] decides which identifiers a delta may touch
//! - [`statement`] maps one descriptor to parameterized SQL (pure)
//! - [`applier`] runs a whole manifest inside one SQLite transaction

pub mod allowlist;
pub mod applier;
mod error;
pub mod manifest;
pub mod statement;
mod types;

pub use allowlist::{is_valid_identifier, validate_change, Allowlist};
pub use applier::{execute_statements, ApplyReport, ChangeApplier};
pub use error::{DeltaError, DeltaResult, ValidationIssue};
pub use manifest::{manifest_file_name, ManifestFile, UpdateManifest};
pub use statement::{build_statement, build_statements, quote_identifier, Statement};
pub use types::{ChangeDescriptor, ColumnMap, Operation, SqlValue};
