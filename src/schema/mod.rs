//! Declarative table schema.
//!
//! The schema arrives as JSON shaped like a list of tables:
//!
//! ```json
//! [{
//!   "name": "users",
//!   "fields": [
//!     { "id": 1, "name": "email", "type": "email", "required": true, "unique": true },
//!     { "id": 2, "name": "status", "type": "single-select", "options": ["todo", "done"] }
//!   ]
//! }]
//! ```
//!
//! Values of these types are immutable for the duration of a run.

mod field;
mod load;
mod view;

pub use field::{FIELD_TYPES, Field, FieldKind, ReferentialAction};
pub use load::load_tables;
pub use view::{FilterCondition, SortDirection, View, ViewFilter, ViewGroupBy, ViewSort};

use serde::{Deserialize, Serialize};

/// System-managed columns that resolve without being declared.
pub const SPECIAL_FIELDS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

/// Whether `name` is one of the system-managed columns.
pub fn is_special_field(name: &str) -> bool {
    SPECIAL_FIELDS.contains(&name)
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_constraints: Vec<UniqueConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<View>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<CheckConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    /// Carried for forward compatibility; no destructive DDL is ever generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_destructive: Option<bool>,
}

/// Primary key declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PrimaryKey {
    /// Single column key; `None` means the system `id` column
    Simple {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    /// Multi-column key
    Composite { fields: Vec<String> },
}

/// Table-level unique constraint over one or more columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub name: String,
    pub fields: Vec<String>,
}

/// Explicit index declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
}

/// Table-level (possibly composite) foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub name: String,
    pub fields: Vec<String>,
    pub referenced_table: String,
    pub referenced_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

/// Named CHECK constraint with a SQL boolean expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    pub check: String,
}

/// Access rules attached to a table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub organization_scoped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<PermissionRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<PermissionRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<PermissionRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<PermissionRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldPermission>,
}

/// Who may perform an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PermissionRule {
    Public,
    Authenticated,
    Roles { roles: Vec<String> },
    /// Row owner, identified by a user-reference column
    Owner { field: String },
}

/// Per-field read/write override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPermission {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<PermissionRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<PermissionRule>,
}

impl Table {
    /// Create an empty table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            fields: Vec::new(),
            primary_key: None,
            unique_constraints: Vec::new(),
            indexes: Vec::new(),
            views: Vec::new(),
            foreign_keys: Vec::new(),
            constraints: Vec::new(),
            permissions: None,
            allow_destructive: None,
        }
    }

    /// Builder: append a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Find a declared field by name.
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a declared field or a special field.
    pub fn resolves(&self, name: &str) -> bool {
        is_special_field(name) || self.find_field(name).is_some()
    }

    /// Whether `name` resolves to a physical column (special fields included).
    pub fn resolves_column(&self, name: &str) -> bool {
        if is_special_field(name) {
            return true;
        }
        self.find_field(name).is_some_and(|f| !f.kind.is_virtual())
    }

    /// Formula fields in declaration order.
    pub fn formula_fields(&self) -> impl Iterator<Item = (&Field, &str)> {
        self.fields.iter().filter_map(|f| match &f.kind {
            FieldKind::Formula { formula, .. } => Some((f, formula.as_str())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_from_json() {
        let json = r#"{
            "name": "projects",
            "fields": [
                { "id": 1, "name": "title", "type": "single-line-text", "required": true },
                { "id": 2, "name": "budget", "type": "currency", "currency": "EUR" },
                { "id": 3, "name": "score", "type": "formula", "formula": "budget * 2" }
            ],
            "primaryKey": { "type": "composite", "fields": ["title", "budget"] },
            "permissions": { "organizationScoped": false, "read": { "type": "public" } }
        }"#;

        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.name, "projects");
        assert_eq!(table.fields.len(), 3);
        assert!(table.fields[0].required);
        assert!(matches!(table.fields[1].kind, FieldKind::Currency { .. }));
        assert_eq!(
            table.primary_key,
            Some(PrimaryKey::Composite {
                fields: vec!["title".into(), "budget".into()]
            })
        );
        assert_eq!(table.formula_fields().count(), 1);
    }

    #[test]
    fn test_special_fields_resolve() {
        let table = Table::new("t").field(Field::new(1, "a", FieldKind::Integer {
            min: None,
            max: None,
        }));
        assert!(table.resolves("a"));
        assert!(table.resolves("created_at"));
        assert!(table.resolves("id"));
        assert!(!table.resolves("b"));
    }

    #[test]
    fn test_virtual_fields_are_not_columns() {
        let table = Table::new("t").field(Field::new(1, "total", FieldKind::Formula {
            formula: "1 + 1".into(),
            result_type: None,
        }));
        assert!(table.resolves("total"));
        assert!(!table.resolves_column("total"));
    }
}
