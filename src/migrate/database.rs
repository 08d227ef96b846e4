//! Database seam used by the executor and the checksum tracker.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Connection, Executor, PgConnection};

use crate::error::DatabaseError;

pub const CHECKSUM_TABLE: &str = "_tabula_schema_checksum";
pub const HISTORY_TABLE: &str = "_tabula_migration_history";

const CREATE_CHECKSUM_TABLE: &str = "CREATE TABLE IF NOT EXISTS _tabula_schema_checksum (
    id TEXT PRIMARY KEY DEFAULT 'singleton' CHECK (id = 'singleton'),
    checksum TEXT NOT NULL,
    schema JSONB NOT NULL,
    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
)";

const CREATE_HISTORY_TABLE: &str = "CREATE TABLE IF NOT EXISTS _tabula_migration_history (
    id SERIAL PRIMARY KEY,
    checksum TEXT NOT NULL UNIQUE,
    sql_statements TEXT[] NOT NULL,
    applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    execution_time_ms INTEGER NOT NULL
)";

/// One applied migration.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub checksum: String,
    pub statements: Vec<String>,
    pub applied_at: DateTime<Utc>,
    pub execution_time_ms: i32,
}

/// The single connection a migration run talks to.
///
/// `execute` runs raw SQL text (including `BEGIN`/`COMMIT`/`ROLLBACK`) on
/// one session, so statements issued between `BEGIN` and `COMMIT` share a
/// transaction.
#[allow(async_fn_in_trait)]
pub trait Database {
    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError>;

    /// Create the checksum and history tables if they are missing.
    async fn ensure_bookkeeping(&mut self) -> Result<(), DatabaseError>;

    async fn load_checksum(&mut self) -> Result<Option<String>, DatabaseError>;

    /// Upsert the singleton checksum row.
    async fn store_checksum(&mut self, checksum: &str, schema: &Value) -> Result<(), DatabaseError>;

    /// Upsert a history row keyed by checksum.
    async fn record_history(&mut self, entry: &HistoryEntry) -> Result<(), DatabaseError>;

    async fn history_count(&mut self) -> Result<i64, DatabaseError>;
}

/// PostgreSQL over a single sqlx connection.
pub struct PgDatabase {
    conn: PgConnection,
}

impl PgDatabase {
    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let conn = PgConnection::connect(url).await?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: PgConnection) -> Self {
        Self { conn }
    }

    pub async fn close(self) -> Result<(), DatabaseError> {
        self.conn.close().await?;
        Ok(())
    }
}

impl Database for PgDatabase {
    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError> {
        // No arguments: sent over the simple query protocol, so DO blocks work.
        (&mut self.conn).execute(sql).await?;
        Ok(())
    }

    async fn ensure_bookkeeping(&mut self) -> Result<(), DatabaseError> {
        (&mut self.conn).execute(CREATE_CHECKSUM_TABLE).await?;
        (&mut self.conn).execute(CREATE_HISTORY_TABLE).await?;
        Ok(())
    }

    async fn load_checksum(&mut self) -> Result<Option<String>, DatabaseError> {
        let checksum = sqlx::query_scalar::<_, String>(
            "SELECT checksum FROM _tabula_schema_checksum WHERE id = 'singleton'",
        )
        .fetch_optional(&mut self.conn)
        .await?;
        Ok(checksum)
    }

    async fn store_checksum(
        &mut self,
        checksum: &str,
        schema: &Value,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO _tabula_schema_checksum (id, checksum, schema, updated_at)
             VALUES ('singleton', $1, $2, NOW())
             ON CONFLICT (id) DO UPDATE
             SET checksum = EXCLUDED.checksum, schema = EXCLUDED.schema, updated_at = EXCLUDED.updated_at",
        )
        .bind(checksum)
        .bind(Json(schema))
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    async fn record_history(&mut self, entry: &HistoryEntry) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO _tabula_migration_history (checksum, sql_statements, applied_at, execution_time_ms)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (checksum) DO UPDATE
             SET sql_statements = EXCLUDED.sql_statements,
                 applied_at = EXCLUDED.applied_at,
                 execution_time_ms = EXCLUDED.execution_time_ms",
        )
        .bind(&entry.checksum)
        .bind(&entry.statements)
        .bind(entry.applied_at)
        .bind(entry.execution_time_ms)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    async fn history_count(&mut self) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _tabula_migration_history")
            .fetch_one(&mut self.conn)
            .await?;
        Ok(count)
    }
}
