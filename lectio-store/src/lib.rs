//! SQLite storage layer for Lectio.
//!
//! Holds the embedded dataset, the `_metadata` key/value table used by the
//! update engine, and the sync bookkeeping (row version counters and
//! deletion tombstones) for user-owned tables.
//!
//! # Architecture
//!
//! - One [`LocalStore`] per device wraps a single connection
//! - [`metadata`] reads and writes `data_version` / `last_update_check`
//! - [`tracking`] installs the version and tombstone triggers

mod error;
pub mod metadata;
pub mod schema;
mod store;
pub mod tracking;

pub use error::{StoreError, StoreResult};
pub use metadata::{DATA_VERSION_KEY, LAST_UPDATE_CHECK_KEY};
pub use schema::initialize_schema;
pub use store::{LocalStore, UpdateGuard};
pub use tracking::{SyncTable, Tombstone, VersionedRow};

use chrono::{DateTime, SecondsFormat, Utc};

/// Open a SQLite connection with the pragmas every Lectio store uses.
pub fn open_sqlite(path: &std::path::Path) -> StoreResult<rusqlite::Connection> {
    let conn = rusqlite::Connection::open(path)?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &rusqlite::Connection) -> StoreResult<()> {
    // journal_mode answers with the mode actually in effect
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::warn!(mode = %mode, "SQLite refused WAL journal mode");
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(())
}

/// Render a timestamp the way the triggers do, so stored values sort
/// lexicographically.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
