//! In-memory [`Database`] for tests and dry runs.
//!
//! Models just enough of a transactional catalog: tables and indexes named
//! by `CREATE ... IF NOT EXISTS` statements, the checksum row and history.
//! Everything done between `BEGIN` and `ROLLBACK` disappears.

use std::collections::BTreeSet;

use serde_json::Value;

use super::database::{Database, HistoryEntry};
use crate::error::DatabaseError;

#[derive(Debug, Clone, Default)]
struct Catalog {
    tables: BTreeSet<String>,
    indexes: BTreeSet<String>,
    checksum: Option<(String, Value)>,
    history: Vec<HistoryEntry>,
}

/// Transactional catalog simulation with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    committed: Catalog,
    pending: Option<Catalog>,
    log: Vec<String>,
    fail_marker: Option<String>,
    fail_commit: bool,
    fail_rollback: bool,
}

/// Name following `prefix` (case-insensitive), unquoted.
fn object_name<'a>(sql: &'a str, prefix: &str) -> Option<&'a str> {
    let head = sql.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = sql[prefix.len()..].trim_start();
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(rest.len());
    Some(rest[..end].trim_matches('"'))
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any statement containing `marker` fails with a syntax error.
    pub fn fail_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    pub fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn fail_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    /// Committed tables, sorted.
    pub fn tables(&self) -> Vec<&str> {
        self.committed.tables.iter().map(String::as_str).collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.committed.tables.contains(name)
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.committed.indexes.contains(name)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.committed.history
    }

    pub fn stored_checksum(&self) -> Option<&str> {
        self.committed.checksum.as_ref().map(|(c, _)| c.as_str())
    }

    /// Every statement passed to `execute`, transaction control included.
    pub fn statements(&self) -> &[String] {
        &self.log
    }

    /// Executed statements other than `BEGIN`/`COMMIT`/`ROLLBACK`.
    pub fn ddl_statements(&self) -> Vec<&str> {
        self.log
            .iter()
            .map(String::as_str)
            .filter(|s| !matches!(s.to_ascii_uppercase().as_str(), "BEGIN" | "COMMIT" | "ROLLBACK"))
            .collect()
    }

    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    fn current(&mut self) -> &mut Catalog {
        match &mut self.pending {
            Some(pending) => pending,
            None => &mut self.committed,
        }
    }

    fn apply(&mut self, sql: &str) {
        let sql = sql.trim();
        if let Some(name) = object_name(sql, "CREATE TABLE IF NOT EXISTS") {
            let name = name.to_string();
            self.current().tables.insert(name);
            return;
        }
        for prefix in ["CREATE INDEX IF NOT EXISTS", "CREATE UNIQUE INDEX IF NOT EXISTS"] {
            if let Some(name) = object_name(sql, prefix) {
                let name = name.to_string();
                self.current().indexes.insert(name);
                return;
            }
        }
    }
}

impl Database for MemoryDatabase {
    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError> {
        self.log.push(sql.to_string());
        match sql.trim().to_ascii_uppercase().as_str() {
            "BEGIN" => {
                if self.pending.is_none() {
                    self.pending = Some(self.committed.clone());
                }
                return Ok(());
            }
            "COMMIT" => {
                if self.fail_commit {
                    return Err(DatabaseError::with_code("40001", "could not serialize access"));
                }
                if let Some(pending) = self.pending.take() {
                    self.committed = pending;
                }
                return Ok(());
            }
            "ROLLBACK" => {
                if self.fail_rollback {
                    return Err(DatabaseError::new("connection closed"));
                }
                self.pending = None;
                return Ok(());
            }
            _ => {}
        }

        if let Some(marker) = &self.fail_marker {
            if sql.contains(marker.as_str()) {
                return Err(DatabaseError::with_code(
                    "42601",
                    format!("syntax error at or near \"{marker}\""),
                ));
            }
        }
        self.apply(sql);
        Ok(())
    }

    async fn ensure_bookkeeping(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn load_checksum(&mut self) -> Result<Option<String>, DatabaseError> {
        Ok(self.current().checksum.as_ref().map(|(c, _)| c.clone()))
    }

    async fn store_checksum(
        &mut self,
        checksum: &str,
        schema: &Value,
    ) -> Result<(), DatabaseError> {
        self.current().checksum = Some((checksum.to_string(), schema.clone()));
        Ok(())
    }

    async fn record_history(&mut self, entry: &HistoryEntry) -> Result<(), DatabaseError> {
        let history = &mut self.current().history;
        match history.iter_mut().find(|h| h.checksum == entry.checksum) {
            Some(existing) => *existing = entry.clone(),
            None => history.push(entry.clone()),
        }
        Ok(())
    }

    async fn history_count(&mut self) -> Result<i64, DatabaseError> {
        Ok(self.current().history.len() as i64)
    }
}
