//! Thread-safe handle to the device's single SQLite connection.

use crate::error::{StoreError, StoreResult};
use crate::metadata;
use crate::schema::initialize_schema;
use lectio_delta::{ApplyReport, ChangeApplier, Statement};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// The local store: one connection per device, shared by every component.
///
/// Cloning is cheap and yields another handle to the same connection.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    /// Set while an update check runs against this store, from any handle.
    update_running: Arc<AtomicBool>,
}

/// Claim on the store's single update slot. Released on drop.
#[derive(Debug)]
pub struct UpdateGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl LocalStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = crate::open_sqlite(path)?;
        initialize_schema(&conn)?;
        info!(path = %path.display(), "Local store opened");
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            update_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claim the update slot shared by every clone of this store.
    /// `None` while another holder has it.
    pub fn try_begin_update(&self) -> Option<UpdateGuard> {
        self.update_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UpdateGuard {
                flag: self.update_running.clone(),
            })
    }

    /// Acquire the connection lock, recovering from poison if a previous
    /// holder panicked.
    pub fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("LocalStore recovering from poisoned mutex");
            poisoned.into_inner()
        })
    }

    /// Current dataset version, 0 when never set.
    pub fn data_version(&self) -> StoreResult<i64> {
        metadata::data_version(&self.lock_conn())
    }

    pub fn set_data_version(&self, version: i64) -> StoreResult<()> {
        metadata::set_data_version(&self.lock_conn(), version)
    }

    pub fn last_update_check(&self) -> StoreResult<Option<chrono::DateTime<chrono::Utc>>> {
        metadata::last_update_check(&self.lock_conn())
    }

    pub fn set_last_update_check(&self, at: chrono::DateTime<chrono::Utc>) -> StoreResult<()> {
        metadata::set_last_update_check(&self.lock_conn(), at)
    }

    pub fn metadata(&self, key: &str) -> StoreResult<Option<String>> {
        metadata::get(&self.lock_conn(), key)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> StoreResult<()> {
        metadata::set(&self.lock_conn(), key, value)
    }

    /// Run prepared delta statements and move `data_version` from
    /// `from_version` to `new_version` in the same IMMEDIATE transaction.
    /// Either both land or neither does.
    ///
    /// Fails with [`StoreError::VersionConflict`] when the stored version is
    /// no longer `from_version`, or when `new_version` would not move it forward.
    pub fn apply_versioned(
        &self,
        applier: &ChangeApplier,
        statements: &[Statement],
        from_version: i64,
        new_version: i64,
    ) -> StoreResult<ApplyReport> {
        let mut conn = self.lock_conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let found = metadata::data_version(&tx)?;
        if found != from_version || new_version <= found {
            return Err(StoreError::VersionConflict {
                expected: from_version,
                found,
                target: new_version,
            });
        }
        let report = applier.apply_in(&tx, statements)?;
        metadata::set_data_version(&tx, new_version)?;
        tx.commit()?;
        info!(
            version = new_version,
            statements = report.statements,
            rows_affected = report.rows_affected,
            "Dataset delta committed"
        );
        Ok(report)
    }
}
