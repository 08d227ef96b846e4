//! Loading tables from raw JSON.
//!
//! Field types are checked before typed deserialization so that an unknown
//! `type` string surfaces as [`CompileError::UnknownFieldType`] with the
//! table and field it belongs to.

use serde_json::Value;

use super::{FIELD_TYPES, Table};
use crate::error::CompileError;

/// Parse a JSON document holding either `[table, ...]` or `{ "tables": [...] }`.
pub fn load_tables(json: &str) -> Result<Vec<Table>, CompileError> {
    let doc: Value =
        serde_json::from_str(json).map_err(|e| CompileError::MalformedSchema(e.to_string()))?;

    let tables = match doc {
        Value::Array(_) => doc,
        Value::Object(mut obj) => obj.remove("tables").ok_or_else(|| {
            CompileError::MalformedSchema("expected an array of tables or a `tables` key".into())
        })?,
        _ => {
            return Err(CompileError::MalformedSchema(
                "expected an array of tables".into(),
            ));
        }
    };

    check_field_types(&tables)?;

    serde_json::from_value(tables).map_err(|e| CompileError::MalformedSchema(e.to_string()))
}

fn check_field_types(tables: &Value) -> Result<(), CompileError> {
    let Some(tables) = tables.as_array() else {
        return Err(CompileError::MalformedSchema(
            "`tables` must be an array".into(),
        ));
    };

    for table in tables {
        let table_name = table.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");
        let Some(fields) = table.get("fields").and_then(Value::as_array) else {
            continue;
        };
        for field in fields {
            let field_name = field.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");
            let type_name = field.get("type").and_then(Value::as_str).ok_or_else(|| {
                CompileError::MalformedSchema(format!(
                    "table '{table_name}': field '{field_name}' has no `type`"
                ))
            })?;
            if !FIELD_TYPES.contains(&type_name) {
                return Err(CompileError::UnknownFieldType {
                    table: table_name.to_string(),
                    field: field_name.to_string(),
                    type_name: type_name.to_string(),
                });
            }
        }
    }
    Ok(())
}
