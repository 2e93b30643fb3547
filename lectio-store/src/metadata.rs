//! Key/value metadata records.
//!
//! Functions take a plain `&Connection` so they also run inside a
//! transaction (`Transaction` derefs to `Connection`).

use crate::error::{StoreError, StoreResult};
use crate::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

pub const DATA_VERSION_KEY: &str = "data_version";
pub const LAST_UPDATE_CHECK_KEY: &str = "last_update_check";

pub fn get(conn: &Connection, key: &str) -> StoreResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM _metadata WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set(conn: &Connection, key: &str, value: &str) -> StoreResult<()> {
    conn.execute(
        r#"INSERT INTO _metadata (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        params![key, value, format_timestamp(Utc::now())],
    )?;
    Ok(())
}

/// Dataset version; a store that was never updated is at version 0.
pub fn data_version(conn: &Connection) -> StoreResult<i64> {
    match get(conn, DATA_VERSION_KEY)? {
        None => Ok(0),
        Some(raw) => raw.trim().parse().map_err(|_| StoreError::InvalidValue {
            key: DATA_VERSION_KEY.to_string(),
            value: raw,
        }),
    }
}

pub fn set_data_version(conn: &Connection, version: i64) -> StoreResult<()> {
    set(conn, DATA_VERSION_KEY, &version.to_string())
}

/// When updates were last checked. Unreadable values count as "never".
pub fn last_update_check(conn: &Connection) -> StoreResult<Option<DateTime<Utc>>> {
    let Some(raw) = get(conn, LAST_UPDATE_CHECK_KEY)? else {
        return Ok(None);
    };
    let parsed = parse_timestamp(&raw);
    if parsed.is_none() {
        warn!(value = %raw, "Ignoring unparsable last_update_check");
    }
    Ok(parsed)
}

pub fn set_last_update_check(conn: &Connection, at: DateTime<Utc>) -> StoreResult<()> {
    set(conn, LAST_UPDATE_CHECK_KEY, &format_timestamp(at))
}
