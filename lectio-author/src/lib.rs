//! Offline producer of Lectio update manifests.
//!
//! Operators describe data fixes as `--table/--operation/--where/--set`
//! groups (or `--update TABLE WHERE DATA` shorthands). This crate parses
//! them into change descriptors, validates them against the dataset
//! allowlist, writes `update_v{N}.json` and renders a review summary.

mod assignments;
mod draft;
mod error;
mod output;

pub use assignments::{coerce_value, parse_assignments};
pub use draft::{ChangeSpec, ManifestDraft};
pub use error::{AuthorError, AuthorResult};
pub use output::{render_summary, write_manifest, WriteOutcome};
