//! Atomic application of a validated change batch.

use crate::allowlist::Allowlist;
use crate::error::{DeltaError, DeltaResult};
use crate::statement::{build_statements, Statement};
use crate::types::ChangeDescriptor;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

/// Outcome of applying a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub statements: usize,
    pub rows_affected: usize,
}

/// Applies change batches against a SQLite connection.
#[derive(Debug, Clone, Default)]
pub struct ChangeApplier {
    allowlist: Allowlist,
}

impl ChangeApplier {
    pub fn new(allowlist: Allowlist) -> Self {
        Self { allowlist }
    }

    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    /// Validate and build every statement without touching the database.
    pub fn prepare(&self, changes: &[ChangeDescriptor]) -> DeltaResult<Vec<Statement>> {
        build_statements(&self.allowlist, changes)
    }

    /// Apply `changes` in one IMMEDIATE transaction.
    ///
    /// Nothing is written unless every descriptor validates and every
    /// statement succeeds.
    pub fn apply(
        &self,
        conn: &mut Connection,
        changes: &[ChangeDescriptor],
    ) -> DeltaResult<ApplyReport> {
        let statements = self.prepare(changes)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let report = execute_statements(&tx, &statements)?;
        tx.commit()?;
        info!(
            statements = report.statements,
            rows_affected = report.rows_affected,
            "Delta batch committed"
        );
        Ok(report)
    }

    /// Run prepared statements inside a transaction the caller owns.
    pub fn apply_in(&self, tx: &Transaction<'_>, statements: &[Statement]) -> DeltaResult<ApplyReport> {
        execute_statements(tx, statements)
    }
}

/// Execute statements in order. Stops at the first failure; the caller's
/// transaction is then expected to roll back.
pub fn execute_statements(tx: &Transaction<'_>, statements: &[Statement]) -> DeltaResult<ApplyReport> {
    let mut report = ApplyReport::default();
    for stmt in statements {
        let affected = tx
            .execute(&stmt.sql, params_from_iter(stmt.params.iter()))
            .map_err(|source| DeltaError::Transaction {
                index: stmt.index,
                table: stmt.table.clone(),
                source,
            })?;
        debug!(index = stmt.index, table = %stmt.table, affected, "Applied change");
        report.statements += 1;
        report.rows_affected += affected;
    }
    Ok(report)
}
