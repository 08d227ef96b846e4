use std::collections::HashSet;

use crate::error::ValidationError;
use crate::schema::{PermissionRule, Table};

/// Column that scopes rows to an organization.
pub const ORGANIZATION_FIELD: &str = "organization_id";

fn check_rule(
    table: &Table,
    rule: &PermissionRule,
    at: Vec<String>,
) -> Result<(), ValidationError> {
    match rule {
        PermissionRule::Public | PermissionRule::Authenticated => Ok(()),
        PermissionRule::Roles { roles } => {
            if roles.is_empty() || roles.iter().any(|r| r.trim().is_empty()) {
                let mut at = at;
                at.push("roles".into());
                return Err(ValidationError::new(
                    &table.name,
                    "Role-based permission requires at least one non-empty role",
                    at,
                ));
            }
            Ok(())
        }
        PermissionRule::Owner { field } => {
            if !table.resolves_column(field) {
                let mut at = at;
                at.push("field".into());
                return Err(ValidationError::new(
                    &table.name,
                    format!("Owner permission references non-existent field '{field}'"),
                    at,
                ));
            }
            Ok(())
        }
    }
}

pub(super) fn validate_permissions(table: &Table) -> Result<(), ValidationError> {
    let Some(perms) = &table.permissions else {
        return Ok(());
    };

    let operations = [
        ("read", &perms.read),
        ("create", &perms.create),
        ("update", &perms.update),
        ("delete", &perms.delete),
    ];
    for (op, rule) in operations {
        if let Some(rule) = rule {
            check_rule(table, rule, vec!["permissions".into(), op.into()])?;
        }
    }

    let mut seen = HashSet::new();
    for (i, fp) in perms.fields.iter().enumerate() {
        let base = vec!["permissions".to_string(), "fields".to_string(), i.to_string()];
        if !table.resolves(&fp.field) {
            let mut at = base;
            at.push("field".into());
            return Err(ValidationError::new(
                &table.name,
                format!("Field permission references non-existent field '{}'", fp.field),
                at,
            ));
        }
        if !seen.insert(fp.field.as_str()) {
            let mut at = base;
            at.push("field".into());
            return Err(ValidationError::new(
                &table.name,
                format!("Duplicate permission entry for field '{}'", fp.field),
                at,
            ));
        }
        for (op, rule) in [("read", &fp.read), ("write", &fp.write)] {
            if let Some(rule) = rule {
                let mut at = base.clone();
                at.push(op.into());
                check_rule(table, rule, at)?;
            }
        }
    }
    Ok(())
}

pub(super) fn validate_organization_scope(table: &Table) -> Result<(), ValidationError> {
    let scoped = table
        .permissions
        .as_ref()
        .is_some_and(|p| p.organization_scoped);
    if scoped && table.find_field(ORGANIZATION_FIELD).is_none() {
        return Err(ValidationError::new(
            &table.name,
            format!(
                "Table is organization-scoped but has no '{ORGANIZATION_FIELD}' field"
            ),
            ["permissions", "organizationScoped"],
        ));
    }
    Ok(())
}
