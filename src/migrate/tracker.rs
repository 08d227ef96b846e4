use serde_json::Value;
use tracing::debug;

use super::database::Database;
use crate::error::DatabaseError;

/// Reads and writes the last-applied schema checksum.
pub struct ChecksumTracker<'a, D: Database> {
    db: &'a mut D,
}

impl<'a, D: Database> ChecksumTracker<'a, D> {
    pub fn new(db: &'a mut D) -> Self {
        Self { db }
    }

    pub async fn stored(&mut self) -> Result<Option<String>, DatabaseError> {
        self.db.load_checksum().await
    }

    /// True when nothing is stored yet or the stored checksum differs.
    pub async fn has_changed(&mut self, checksum: &str) -> Result<bool, DatabaseError> {
        let stored = self.stored().await?;
        debug!(stored = ?stored, current = checksum, "compared schema checksum");
        Ok(stored.as_deref() != Some(checksum))
    }

    /// Persist the checksum. Call only after the migration committed.
    pub async fn save(&mut self, checksum: &str, snapshot: &Value) -> Result<(), DatabaseError> {
        self.db.store_checksum(checksum, snapshot).await
    }
}
