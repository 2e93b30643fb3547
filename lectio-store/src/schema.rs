//! DDL for the local store.

use crate::error::StoreResult;
use crate::tracking::{install_tracking, SyncTable};
use rusqlite::Connection;

/// Key/value table for engine bookkeeping.
const METADATA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS _metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
"#;

/// Deletion markers for previously synced user rows.
const TOMBSTONES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS _sync_tombstones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name TEXT NOT NULL,
    remote_id TEXT NOT NULL,
    owner TEXT,
    deleted_at TEXT NOT NULL,
    synced_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_sync_tombstones_pending
    ON _sync_tombstones (owner, synced_at);
"#;

/// Embedded dataset tables. Shipped pre-populated; created here so a fresh
/// store (and tests) have the same shape.
const DATASET_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS translations (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    language TEXT NOT NULL DEFAULT 'en'
);
CREATE TABLE IF NOT EXISTS bible_books (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    testament TEXT NOT NULL DEFAULT 'OT',
    chapters INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS bible_verses (
    id INTEGER PRIMARY KEY,
    book_id INTEGER NOT NULL,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    text TEXT NOT NULL,
    UNIQUE (book_id, chapter, verse)
);
CREATE TABLE IF NOT EXISTS cross_references (
    id INTEGER PRIMARY KEY,
    from_verse_id INTEGER NOT NULL,
    to_verse_start_id INTEGER NOT NULL,
    to_verse_end_id INTEGER,
    votes INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_cross_references_from
    ON cross_references (from_verse_id);
CREATE TABLE IF NOT EXISTS reading_plans (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    total_days INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS reading_plan_days (
    id INTEGER PRIMARY KEY,
    plan_id INTEGER NOT NULL,
    day_number INTEGER NOT NULL,
    reading TEXT NOT NULL,
    UNIQUE (plan_id, day_number)
);
"#;

/// User-owned tables. Every one carries the sync columns
/// (`version`, `updated_at`, `synced_at`, `remote_id`).
const USER_TABLES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS user_notes (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    verse_id INTEGER,
    body TEXT NOT NULL DEFAULT '',
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    synced_at TEXT,
    remote_id TEXT
);
CREATE TABLE IF NOT EXISTS user_highlights (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    verse_id INTEGER NOT NULL,
    color TEXT NOT NULL DEFAULT 'yellow',
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    synced_at TEXT,
    remote_id TEXT
);
CREATE TABLE IF NOT EXISTS user_bookmarks (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    verse_id INTEGER NOT NULL,
    label TEXT,
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    synced_at TEXT,
    remote_id TEXT
);
"#;

/// User-owned tables that get version and tombstone triggers.
pub const USER_TABLES: &[&str] = &["user_notes", "user_highlights", "user_bookmarks"];

/// Create every table and trigger. Safe to run on each open.
pub fn initialize_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(METADATA_DDL)?;
    conn.execute_batch(TOMBSTONES_DDL)?;
    conn.execute_batch(DATASET_DDL)?;
    conn.execute_batch(USER_TABLES_DDL)?;
    for table in USER_TABLES {
        install_tracking(conn, &SyncTable::user_owned(table)?)?;
    }
    Ok(())
}
