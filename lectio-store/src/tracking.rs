//! Sync bookkeeping for user-owned rows: version counters and tombstones.
//!
//! Every syncable table carries `version`, `updated_at`, `synced_at` and
//! `remote_id`. Two triggers maintain them:
//!
//! - an ordinary edit (a write that leaves `version` and `synced_at`
//!   untouched) bumps `version` by one and refreshes `updated_at`;
//! - deleting a row that already has a `remote_id` records a tombstone.
//!
//! A sync-applied write sets `version` (and usually `synced_at`) explicitly
//! and is not incremented again. Rows deleted before they ever synced leave
//! no trace.

use crate::error::{StoreError, StoreResult};
use crate::store::LocalStore;
use crate::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use lectio_delta::{is_valid_identifier, quote_identifier};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// A table whose rows take part in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTable {
    name: String,
    key_column: String,
    owner_column: String,
}

impl SyncTable {
    pub fn new(name: &str, key_column: &str, owner_column: &str) -> StoreResult<Self> {
        for ident in [name, key_column, owner_column] {
            if !is_valid_identifier(ident) {
                return Err(StoreError::InvalidIdentifier(ident.to_string()));
            }
        }
        Ok(Self {
            name: name.to_string(),
            key_column: key_column.to_string(),
            owner_column: owner_column.to_string(),
        })
    }

    /// Layout of the built-in user tables: key `id`, owner `owner_id`.
    pub fn user_owned(name: &str) -> StoreResult<Self> {
        Self::new(name, "id", "owner_id")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn version_trigger(&self) -> String {
        format!("trg_{}_version", self.name)
    }

    fn tombstone_trigger(&self) -> String {
        format!("trg_{}_tombstone", self.name)
    }
}

/// Install (or reinstall) the version and tombstone triggers for `table`.
pub fn install_tracking(conn: &Connection, table: &SyncTable) -> StoreResult<()> {
    let t = quote_identifier(&table.name);
    let key = quote_identifier(&table.key_column);
    let owner = quote_identifier(&table.owner_column);
    let version_trg = quote_identifier(&table.version_trigger());
    let tombstone_trg = quote_identifier(&table.tombstone_trigger());

    let ddl = format!(
        r#"
DROP TRIGGER IF EXISTS {version_trg};
CREATE TRIGGER {version_trg}
AFTER UPDATE ON {t}
FOR EACH ROW
WHEN NEW.version = OLD.version AND NEW.synced_at IS OLD.synced_at
BEGIN
    UPDATE {t}
    SET version = OLD.version + 1, updated_at = {NOW_SQL}
    WHERE {key} = NEW.{key};
END;

DROP TRIGGER IF EXISTS {tombstone_trg};
CREATE TRIGGER {tombstone_trg}
AFTER DELETE ON {t}
FOR EACH ROW
WHEN OLD.remote_id IS NOT NULL
BEGIN
    INSERT INTO _sync_tombstones (table_name, remote_id, owner, deleted_at)
    VALUES ('{name}', OLD.remote_id, OLD.{owner}, {NOW_SQL});
END;
"#,
        // validated identifier: no quotes to escape
        name = table.name,
    );
    conn.execute_batch(&ddl)?;
    debug!(table = %table.name, "Sync triggers installed");
    Ok(())
}

/// A locally deleted row that had already synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tombstone {
    pub id: i64,
    pub table_name: String,
    pub remote_id: String,
    pub owner: Option<String>,
    pub deleted_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Sync state of one user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionedRow {
    pub key: String,
    pub remote_id: Option<String>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

fn timestamp_column(key: &str, raw: String) -> StoreResult<DateTime<Utc>> {
    parse_timestamp(&raw).ok_or_else(|| StoreError::InvalidValue {
        key: key.to_string(),
        value: raw,
    })
}

fn optional_timestamp(key: &str, raw: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    raw.map(|r| timestamp_column(key, r)).transpose()
}

impl LocalStore {
    /// Tombstones not yet pushed upstream, oldest first.
    pub fn pending_tombstones(&self, owner: Option<&str>) -> StoreResult<Vec<Tombstone>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            r#"SELECT id, table_name, remote_id, owner, deleted_at, synced_at
               FROM _sync_tombstones
               WHERE synced_at IS NULL AND (?1 IS NULL OR owner = ?1)
               ORDER BY id"#,
        )?;
        let raw = stmt
            .query_map(params![owner], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(id, table_name, remote_id, owner, deleted_at, synced_at)| {
                Ok(Tombstone {
                    id,
                    table_name,
                    remote_id,
                    owner,
                    deleted_at: timestamp_column("deleted_at", deleted_at)?,
                    synced_at: optional_timestamp("synced_at", synced_at)?,
                })
            })
            .collect()
    }

    /// Stamp tombstones as pushed. Returns how many were updated.
    pub fn mark_tombstones_synced(&self, ids: &[i64], at: DateTime<Utc>) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders: Vec<String> = (2..ids.len() + 2).map(|n| format!("?{n}")).collect();
        let sql = format!(
            "UPDATE _sync_tombstones SET synced_at = ?1 WHERE id IN ({})",
            placeholders.join(", ")
        );
        let stamp = format_timestamp(at);
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(ids.len() + 1);
        values.push(&stamp);
        values.extend(ids.iter().map(|id| id as &dyn rusqlite::ToSql));

        let conn = self.lock_conn();
        let updated = conn.execute(&sql, params_from_iter(values))?;
        Ok(updated)
    }

    /// Drop tombstones that were pushed before `before`.
    pub fn purge_synced_tombstones(&self, before: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.lock_conn();
        let purged = conn.execute(
            "DELETE FROM _sync_tombstones WHERE synced_at IS NOT NULL AND synced_at < ?1",
            params![format_timestamp(before)],
        )?;
        if purged > 0 {
            info!(purged, "Purged synced tombstones");
        }
        Ok(purged)
    }

    /// Rows of `owner` that were never synced or changed after their last sync.
    pub fn changed_since_sync(&self, table: &SyncTable, owner: &str) -> StoreResult<Vec<VersionedRow>> {
        let sql = format!(
            r#"SELECT CAST({key} AS TEXT), remote_id, version, updated_at, synced_at
               FROM {t}
               WHERE {owner} = ?1 AND (synced_at IS NULL OR updated_at > synced_at)
               ORDER BY updated_at, {key}"#,
            key = quote_identifier(&table.key_column),
            t = quote_identifier(&table.name),
            owner = quote_identifier(&table.owner_column),
        );
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params![owner], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(key, remote_id, version, updated_at, synced_at)| {
                Ok(VersionedRow {
                    key,
                    remote_id,
                    version,
                    updated_at: timestamp_column("updated_at", updated_at)?,
                    synced_at: optional_timestamp("synced_at", synced_at)?,
                })
            })
            .collect()
    }

    /// Record the outcome of pushing a row: its remote id and the
    /// authoritative version. Not counted as an edit. Repeating the same
    /// call leaves the row untouched. Returns whether the row exists.
    pub fn mark_row_synced(
        &self,
        table: &SyncTable,
        key: &str,
        remote_id: &str,
        version: i64,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let t = quote_identifier(&table.name);
        let key_col = quote_identifier(&table.key_column);
        // an UPDATE that changes nothing would still fire the version trigger
        let update = format!(
            r#"UPDATE {t} SET remote_id = ?1, version = ?2, synced_at = ?3
               WHERE {key_col} = ?4
                 AND NOT (remote_id IS ?1 AND version = ?2 AND synced_at IS ?3)"#
        );
        let exists = format!("SELECT 1 FROM {t} WHERE {key_col} = ?1");

        let conn = self.lock_conn();
        let updated = conn.execute(&update, params![remote_id, version, format_timestamp(at), key])?;
        if updated > 0 {
            return Ok(true);
        }
        let found = conn
            .query_row(&exists, params![key], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Current version counter of a row, if it exists.
    pub fn row_version(&self, table: &SyncTable, key: &str) -> StoreResult<Option<i64>> {
        let sql = format!(
            "SELECT version FROM {t} WHERE {key} = ?1",
            t = quote_identifier(&table.name),
            key = quote_identifier(&table.key_column),
        );
        let conn = self.lock_conn();
        let version = conn
            .query_row(&sql, params![key], |row| row.get(0))
            .optional()?;
        Ok(version)
    }
}
