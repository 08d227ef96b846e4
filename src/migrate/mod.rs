//! Migration orchestration.
//!
//! ```text
//! Idle -> ChecksumComputed -> Skipped                       -> Done
//!                          -> Compiling -> Executed          -> Done
//!                                       -> Failed
//! ```
//!
//! The checksum is persisted only after the executor commits.

pub mod database;
pub mod executor;
pub mod memory;
pub mod tracker;

pub use database::{CHECKSUM_TABLE, Database, HISTORY_TABLE, HistoryEntry, PgDatabase};
pub use executor::{ExecutionReport, Executor, TxState};
pub use memory::MemoryDatabase;
pub use tracker::ChecksumTracker;

use std::time::Instant;

use tracing::{error, info};

use crate::checksum::{migration_checksum, migration_snapshot};
use crate::compiler::{CompileOptions, MigrationPlan, compile_schema};
use crate::error::MigrateResult;
use crate::schema::Table;
use crate::validator::validate_schema;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stored checksum matched; nothing was executed
    Skipped { checksum: String },
    Applied {
        checksum: String,
        report: ExecutionReport,
    },
}

/// Validated, compiled schema that has not touched a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMigration {
    pub checksum: String,
    pub plan: MigrationPlan,
}

/// Database-side view of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub current: String,
    pub stored: Option<String>,
    pub history_count: i64,
}

impl Status {
    pub fn is_up_to_date(&self) -> bool {
        self.stored.as_deref() == Some(self.current.as_str())
    }
}

/// Validate and compile without a database.
pub fn prepare(tables: &[Table], options: &CompileOptions) -> MigrateResult<PreparedMigration> {
    let checksum = migration_checksum(tables, options)?;
    validate_schema(tables)?;
    let plan = compile_schema(tables, options)?;
    Ok(PreparedMigration { checksum, plan })
}

/// Drives one checksum-gated migration over a single connection.
pub struct Migrator<D: Database> {
    db: D,
    options: CompileOptions,
}

impl<D: Database> Migrator<D> {
    pub fn new(db: D, options: CompileOptions) -> Self {
        Self { db, options }
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn into_database(self) -> D {
        self.db
    }

    /// Dry run: validate and compile with this migrator's options.
    pub fn plan(&self, tables: &[Table]) -> MigrateResult<PreparedMigration> {
        prepare(tables, &self.options)
    }

    /// Apply `tables`, or skip when the stored checksum already matches.
    pub async fn run(&mut self, tables: &[Table]) -> MigrateResult<Outcome> {
        let started = Instant::now();
        let checksum = migration_checksum(tables, &self.options)?;
        info!(%checksum, tables = tables.len(), "schema checksum computed");

        self.db.ensure_bookkeeping().await?;
        if !ChecksumTracker::new(&mut self.db).has_changed(&checksum).await? {
            info!(
                %checksum,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "schema unchanged, skipping migration"
            );
            return Ok(Outcome::Skipped { checksum });
        }

        info!("schema changed, compiling");
        let prepared = prepare(tables, &self.options).inspect_err(|e| {
            error!(error = %e, "schema rejected");
        })?;

        let report = Executor::new(&mut self.db)
            .run(&prepared.checksum, &prepared.plan.statements)
            .await
            .inspect_err(|e| {
                error!(phase = %e.phase, sql = ?e.sql, error = %e.cause, "migration failed");
            })?;

        let snapshot = migration_snapshot(tables, &self.options)?;
        ChecksumTracker::new(&mut self.db)
            .save(&prepared.checksum, &snapshot)
            .await?;
        info!(
            checksum = %prepared.checksum,
            statements = report.statements,
            "migration applied"
        );

        Ok(Outcome::Applied {
            checksum: prepared.checksum,
            report,
        })
    }

    /// Compare `tables` with what the database last applied.
    pub async fn status(&mut self, tables: &[Table]) -> MigrateResult<Status> {
        let current = migration_checksum(tables, &self.options)?;
        self.db.ensure_bookkeeping().await?;
        let stored = ChecksumTracker::new(&mut self.db).stored().await?;
        let history_count = self.db.history_count().await?;
        Ok(Status {
            current,
            stored,
            history_count,
        })
    }
}
