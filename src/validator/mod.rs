//! Schema validation.
//!
//! Runs a fixed sequence of checks per table and stops at the first failure:
//!
//! 1. structure (non-empty, unique field ids and names)
//! 2. formula syntax
//! 3. formula references
//! 4. formula cycles
//! 5. primary key
//! 6. indexes, unique constraints, foreign-key columns, CHECK constraints
//! 7. field and table permissions
//! 8. views
//! 9. computed-field relationships
//! 10. organization scope
//!
//! Once every table passes, index names are checked across the whole schema.
//!
//! Nothing here touches the database.

mod computed;
mod keys;
mod permissions;
mod views;

pub use views::{FieldCategory, FILTER_OPERATORS, operator_allowed};

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::formula::{self, DependencyGraph};
use crate::schema::Table;

/// Validate every table, then cross-table invariants.
pub fn validate_schema(tables: &[Table]) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for table in tables {
        if !names.insert(table.name.as_str()) {
            return Err(ValidationError::new(
                &table.name,
                format!("Duplicate table name '{}'", table.name),
                ["name"],
            ));
        }
    }

    for table in tables {
        validate_table(table)?;
    }
    keys::validate_index_namespace(tables)
}

/// Validate one table in the fixed fail-first order.
pub fn validate_table(table: &Table) -> Result<(), ValidationError> {
    validate_structure(table)?;
    validate_formula_syntax(table)?;
    validate_formula_references(table)?;
    validate_formula_cycles(table)?;
    keys::validate_primary_key(table)?;
    keys::validate_indexes(table)?;
    keys::validate_check_constraints(table)?;
    permissions::validate_permissions(table)?;
    views::validate_views(table)?;
    computed::validate_computed_fields(table)?;
    permissions::validate_organization_scope(table)?;
    Ok(())
}

fn validate_structure(table: &Table) -> Result<(), ValidationError> {
    if table.fields.is_empty() {
        return Err(ValidationError::new(
            &table.name,
            "Table must declare at least one field",
            ["fields"],
        ));
    }

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for (i, field) in table.fields.iter().enumerate() {
        if !ids.insert(field.id) {
            return Err(ValidationError::new(
                &table.name,
                format!("Duplicate field id {}", field.id),
                ["fields".to_string(), i.to_string(), "id".to_string()],
            ));
        }
        if !names.insert(field.name.as_str()) {
            return Err(ValidationError::new(
                &table.name,
                format!("Duplicate field name '{}'", field.name),
                ["fields".to_string(), i.to_string(), "name".to_string()],
            ));
        }
    }
    Ok(())
}

fn formula_path(table: &Table, name: &str) -> Vec<String> {
    let index = table.fields.iter().position(|f| f.name == name).unwrap_or_default();
    vec!["fields".to_string(), index.to_string(), "formula".to_string()]
}

fn validate_formula_syntax(table: &Table) -> Result<(), ValidationError> {
    for (field, formula) in table.formula_fields() {
        formula::check_syntax(formula).map_err(|e| {
            ValidationError::new(
                &table.name,
                format!("Invalid formula syntax in field '{}': {}", field.name, e),
                formula_path(table, &field.name),
            )
        })?;
    }
    Ok(())
}

fn validate_formula_references(table: &Table) -> Result<(), ValidationError> {
    for (field, formula) in table.formula_fields() {
        for reference in formula::extract_references(formula) {
            if !table.resolves(&reference) {
                return Err(ValidationError::new(
                    &table.name,
                    format!(
                        "Formula field '{}' references undefined field '{}'",
                        field.name, reference
                    ),
                    formula_path(table, &field.name),
                ));
            }
        }
    }
    Ok(())
}

fn validate_formula_cycles(table: &Table) -> Result<(), ValidationError> {
    let cycles = DependencyGraph::from_table(table).find_cycles();
    if cycles.is_empty() {
        return Ok(());
    }
    let rendered: Vec<String> = cycles.iter().map(|c| c.join(" -> ")).collect();
    Err(ValidationError::new(
        &table.name,
        format!(
            "Circular dependency detected in formula fields: {}",
            rendered.join("; ")
        ),
        ["fields"],
    ))
}

#[cfg(test)]
mod tests;
