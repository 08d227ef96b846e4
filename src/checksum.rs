//! Schema content hash.
//!
//! The schema is serialized to JSON, canonicalized (object keys sorted,
//! `fields` arrays ordered by field id) and hashed with SHA-256. Cosmetic
//! differences such as key order or field order never change the result.
//!
//! A migration is identified by [`migration_checksum`], which also covers
//! the [`CompileOptions`] the DDL was generated with.

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::compiler::CompileOptions;
use crate::schema::Table;

/// Canonical form of a JSON value.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                let child = canonicalize(&map[key]);
                let child = if key == "fields" { sort_by_id(child) } else { child };
                out.insert(key.clone(), child);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Order an array of objects by their numeric `id`; anything else is left alone.
fn sort_by_id(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.iter().all(|v| v.get("id").is_some_and(Value::is_i64)) => {
            items.sort_by_key(|v| v.get("id").and_then(Value::as_i64).unwrap_or_default());
            Value::Array(items)
        }
        other => other,
    }
}

/// Serialized canonical snapshot of the schema, as stored next to the checksum.
pub fn schema_snapshot(tables: &[Table]) -> Result<Value, serde_json::Error> {
    Ok(canonicalize(&serde_json::to_value(tables)?))
}

/// Hex-encoded SHA-256 of the canonical schema.
pub fn schema_checksum(tables: &[Table]) -> Result<String, serde_json::Error> {
    let canonical = schema_snapshot(tables)?;
    Ok(digest(&serde_json::to_vec(&canonical)?))
}

/// Canonical snapshot of everything that shapes the generated DDL.
pub fn migration_snapshot(
    tables: &[Table],
    options: &CompileOptions,
) -> Result<Value, serde_json::Error> {
    let value = json!({
        "options": serde_json::to_value(options)?,
        "tables": serde_json::to_value(tables)?,
    });
    Ok(canonicalize(&value))
}

/// Hex-encoded SHA-256 of [`migration_snapshot`]; the value the tracker stores.
pub fn migration_checksum(
    tables: &[Table],
    options: &CompileOptions,
) -> Result<String, serde_json::Error> {
    let canonical = migration_snapshot(tables, options)?;
    Ok(digest(&serde_json::to_vec(&canonical)?))
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
