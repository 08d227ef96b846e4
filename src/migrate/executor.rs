//! Migration executor.
//!
//! ```text
//! Idle --BEGIN--> InTransaction --statements, history, COMMIT--> Committed
//!                       |
//!                       +--any failure, ROLLBACK--> RolledBack
//! ```
//!
//! No retries. A failed rollback is reported as a `ROLLBACK`-phase error
//! that still carries the failure which triggered it.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::database::{Database, HistoryEntry};
use crate::error::{DatabaseError, ExecutionError, Phase};

/// Where the executor is in the transaction protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    InTransaction,
    Committed,
    RolledBack,
}

/// What a committed migration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub statements: usize,
    pub elapsed: Duration,
}

pub struct Executor<'a, D: Database> {
    db: &'a mut D,
    state: TxState,
}

impl<'a, D: Database> Executor<'a, D> {
    pub fn new(db: &'a mut D) -> Self {
        Self {
            db,
            state: TxState::Idle,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Run `statements` in one transaction and record them under `checksum`.
    pub async fn run(
        &mut self,
        checksum: &str,
        statements: &[String],
    ) -> Result<ExecutionReport, ExecutionError> {
        let started = Instant::now();

        self.db
            .execute("BEGIN")
            .await
            .map_err(|e| ExecutionError::new(Phase::Begin, Some("BEGIN".into()), e))?;
        self.state = TxState::InTransaction;

        for (i, sql) in statements.iter().enumerate() {
            debug!(step = i + 1, total = statements.len(), %sql, "executing statement");
            if let Err(cause) = self.db.execute(sql).await {
                return Err(self.abort(Phase::Execute, Some(sql.clone()), cause).await);
            }
        }

        let elapsed = started.elapsed();
        let entry = HistoryEntry {
            checksum: checksum.to_string(),
            statements: statements.to_vec(),
            applied_at: Utc::now(),
            execution_time_ms: i32::try_from(elapsed.as_millis()).unwrap_or(i32::MAX),
        };
        if let Err(cause) = self.db.record_history(&entry).await {
            return Err(self.abort(Phase::Track, None, cause).await);
        }

        if let Err(cause) = self.db.execute("COMMIT").await {
            return Err(self.abort(Phase::Commit, Some("COMMIT".into()), cause).await);
        }
        self.state = TxState::Committed;
        info!(
            statements = statements.len(),
            elapsed_ms = entry.execution_time_ms,
            "migration committed"
        );

        Ok(ExecutionReport {
            statements: statements.len(),
            elapsed: started.elapsed(),
        })
    }

    async fn abort(
        &mut self,
        phase: Phase,
        sql: Option<String>,
        cause: DatabaseError,
    ) -> ExecutionError {
        warn!(%phase, error = %cause, "migration failed, rolling back");
        match self.db.execute("ROLLBACK").await {
            Ok(()) => {
                self.state = TxState::RolledBack;
                ExecutionError::new(phase, sql, cause)
            }
            Err(rollback) => {
                error!(error = %rollback, "rollback failed");
                ExecutionError {
                    phase: Phase::Rollback,
                    sql,
                    cause: rollback,
                    trigger: Some(cause),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::memory::MemoryDatabase;

    fn statements(sqls: &[&str]) -> Vec<String> {
        sqls.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_commit_records_history() {
        let mut db = MemoryDatabase::new();
        let plan = statements(&["CREATE TABLE IF NOT EXISTS \"t1\" (\"a\" TEXT)"]);
        let mut exec = Executor::new(&mut db);
        let report = exec.run("sum", &plan).await.unwrap();
        assert_eq!(report.statements, 1);
        assert_eq!(exec.state(), TxState::Committed);

        assert!(db.has_table("t1"));
        assert_eq!(db.history().len(), 1);
        assert_eq!(db.history()[0].statements, plan);
        assert_eq!(db.statements().first().map(String::as_str), Some("BEGIN"));
        assert_eq!(db.statements().last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back() {
        let mut db = MemoryDatabase::new().fail_on("bad syntax");
        let plan = statements(&[
            "CREATE TABLE IF NOT EXISTS \"t1\" (\"a\" TEXT)",
            "CREATE TABLE IF NOT EXISTS \"t2\" (bad syntax)",
            "CREATE TABLE IF NOT EXISTS \"t3\" (\"a\" TEXT)",
        ]);
        let mut exec = Executor::new(&mut db);
        let err = exec.run("sum", &plan).await.unwrap_err();
        assert_eq!(exec.state(), TxState::RolledBack);

        assert_eq!(err.phase, Phase::Execute);
        assert_eq!(err.sql.as_deref(), Some(plan[1].as_str()));
        assert_eq!(err.cause.code.as_deref(), Some("42601"));
        assert!(db.tables().is_empty());
        assert!(db.history().is_empty());
        assert!(!db.statements().iter().any(|s| s.contains("t3")));
        assert_eq!(db.statements().last().map(String::as_str), Some("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_failed_rollback_reports_trigger() {
        let mut db = MemoryDatabase::new().fail_on("boom").fail_rollback();
        let plan = statements(&["SELECT boom"]);
        let err = Executor::new(&mut db).run("sum", &plan).await.unwrap_err();

        assert_eq!(err.phase, Phase::Rollback);
        assert_eq!(err.cause.message, "connection closed");
        assert_eq!(err.trigger.and_then(|t| t.code).as_deref(), Some("42601"));
    }

    #[tokio::test]
    async fn test_commit_failure() {
        let mut db = MemoryDatabase::new().fail_commit();
        let plan = statements(&["CREATE TABLE IF NOT EXISTS \"t1\" (\"a\" TEXT)"]);
        let err = Executor::new(&mut db).run("sum", &plan).await.unwrap_err();
        assert_eq!(err.phase, Phase::Commit);
        assert!(!db.has_table("t1"));
        assert!(!db.in_transaction());
    }
}
