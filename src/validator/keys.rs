//! Primary key, index, unique, foreign-key and CHECK constraint checks.

use std::collections::{HashMap, HashSet};

use crate::compiler::auto_index_names;
use crate::error::ValidationError;
use crate::formula;
use crate::schema::{PrimaryKey, Table};

fn path(parts: &[&str], index: Option<usize>, tail: &str) -> Vec<String> {
    let mut out: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
    if let Some(i) = index {
        out.push(i.to_string());
    }
    out.push(tail.to_string());
    out
}

/// Every entry must name a physical column; duplicates are rejected.
fn check_columns(
    table: &Table,
    fields: &[String],
    what: &str,
    at: Vec<String>,
) -> Result<(), ValidationError> {
    if fields.is_empty() {
        return Err(ValidationError::new(
            &table.name,
            format!("{what} must list at least one field"),
            at,
        ));
    }
    let mut seen = HashSet::new();
    for name in fields {
        if !seen.insert(name.as_str()) {
            return Err(ValidationError::new(
                &table.name,
                format!("{what} lists field '{name}' more than once"),
                at,
            ));
        }
        if !table.resolves_column(name) {
            return Err(ValidationError::new(
                &table.name,
                format!("{what} references non-existent column '{name}'"),
                at,
            ));
        }
    }
    Ok(())
}

pub(super) fn validate_primary_key(table: &Table) -> Result<(), ValidationError> {
    match &table.primary_key {
        None | Some(PrimaryKey::Simple { field: None }) => Ok(()),
        Some(PrimaryKey::Simple { field: Some(name) }) => check_columns(
            table,
            std::slice::from_ref(name),
            "Primary key",
            path(&["primaryKey"], None, "field"),
        ),
        Some(PrimaryKey::Composite { fields }) => check_columns(
            table,
            fields,
            "Composite primary key",
            path(&["primaryKey"], None, "fields"),
        ),
    }
}

pub(super) fn validate_indexes(table: &Table) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for (i, index) in table.indexes.iter().enumerate() {
        if !names.insert(index.name.as_str()) {
            return Err(ValidationError::new(
                &table.name,
                format!("Duplicate index name '{}'", index.name),
                path(&["indexes"], Some(i), "name"),
            ));
        }
        check_columns(
            table,
            &index.fields,
            &format!("Index '{}'", index.name),
            path(&["indexes"], Some(i), "fields"),
        )?;
    }

    for (i, unique) in table.unique_constraints.iter().enumerate() {
        check_columns(
            table,
            &unique.fields,
            &format!("Unique constraint '{}'", unique.name),
            path(&["uniqueConstraints"], Some(i), "fields"),
        )?;
    }

    validate_constraint_names(table)?;

    for (i, fk) in table.foreign_keys.iter().enumerate() {
        check_columns(
            table,
            &fk.fields,
            &format!("Foreign key '{}'", fk.name),
            path(&["foreignKeys"], Some(i), "fields"),
        )?;
        if fk.fields.len() != fk.referenced_fields.len() {
            return Err(ValidationError::new(
                &table.name,
                format!(
                    "Foreign key '{}' has {} field(s) but references {}",
                    fk.name,
                    fk.fields.len(),
                    fk.referenced_fields.len()
                ),
                path(&["foreignKeys"], Some(i), "referencedFields"),
            ));
        }
    }
    Ok(())
}

/// Unique, CHECK and foreign-key constraints share one namespace per table.
fn validate_constraint_names(table: &Table) -> Result<(), ValidationError> {
    let mut named: Vec<(&str, usize, &str)> = Vec::new();
    for (i, c) in table.unique_constraints.iter().enumerate() {
        named.push(("uniqueConstraints", i, c.name.as_str()));
    }
    for (i, c) in table.constraints.iter().enumerate() {
        named.push(("constraints", i, c.name.as_str()));
    }
    for (i, fk) in table.foreign_keys.iter().enumerate() {
        named.push(("foreignKeys", i, fk.name.as_str()));
    }

    let mut seen = HashSet::new();
    for (section, i, name) in named {
        if !seen.insert(name) {
            return Err(ValidationError::new(
                &table.name,
                format!("Duplicate constraint name '{name}'"),
                path(&[section], Some(i), "name"),
            ));
        }
    }
    Ok(())
}

/// Index names (automatic, explicit and unique-constraint backed) are
/// global to the PostgreSQL schema, so they must not collide across tables.
pub(super) fn validate_index_namespace(tables: &[Table]) -> Result<(), ValidationError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for table in tables {
        let auto = auto_index_names(table)
            .into_iter()
            .map(|(i, name)| (path(&["fields"], Some(i), "name"), name));
        let explicit = table
            .indexes
            .iter()
            .enumerate()
            .map(|(i, index)| (path(&["indexes"], Some(i), "name"), index.name.clone()));
        let unique = table
            .unique_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| (path(&["uniqueConstraints"], Some(i), "name"), c.name.clone()));

        for (at, name) in auto.chain(explicit).chain(unique) {
            if let Some(owner) = owners.get(&name) {
                return Err(ValidationError::new(
                    &table.name,
                    format!("Index name '{name}' is already used by table '{owner}'"),
                    at,
                ));
            }
            owners.insert(name, table.name.as_str());
        }
    }
    Ok(())
}

pub(super) fn validate_check_constraints(table: &Table) -> Result<(), ValidationError> {
    for (i, constraint) in table.constraints.iter().enumerate() {
        let at = path(&["constraints"], Some(i), "check");
        formula::check_syntax(&constraint.check).map_err(|e| {
            ValidationError::new(
                &table.name,
                format!("Invalid CHECK constraint '{}': {}", constraint.name, e),
                at.clone(),
            )
        })?;
        for reference in formula::extract_references(&constraint.check) {
            if !table.resolves_column(&reference) {
                return Err(ValidationError::new(
                    &table.name,
                    format!(
                        "CHECK constraint '{}' references non-existent column '{}'",
                        constraint.name, reference
                    ),
                    at,
                ));
            }
        }
    }
    Ok(())
}
