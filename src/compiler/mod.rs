//! Type mapper: field definitions to PostgreSQL column definitions.
//!
//! [`compile_field`] is a pure function from a [`Field`] to either a
//! physical [`ColumnSpec`] or [`Column::Virtual`]. The match over
//! [`FieldKind`] is exhaustive, so a new field type does not compile until
//! it has a mapping here.
//!
//! ```
//! use tabula::compiler::{compile_field, Column, CompileOptions};
//! use tabula::schema::{Field, FieldKind, Table};
//!
//! let table = Table::new("users");
//! let email = Field::new(1, "email", FieldKind::Email).required().unique();
//! let Column::Physical(spec) = compile_field(&table, &email, &CompileOptions::default()).unwrap()
//! else { unreachable!() };
//! assert_eq!(spec.to_sql(), r#""email" TEXT NOT NULL UNIQUE"#);
//! ```

mod ddl;
mod ident;
mod order;

pub use ddl::{
    MigrationPlan, auto_index_names, compile_schema, compile_table, foreign_key_statements,
};
pub use ident::{PG_RESERVED_WORDS, quote_ident, quote_literal, validate_identifier};
pub use order::order_tables;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CompileError, IdentifierKind};
use crate::schema::{Field, FieldKind, ReferentialAction, Table};

const DEFAULT_USERS_TABLE: &str = "users";

/// Precision of `NUMERIC(19,p)`; the scale may not exceed it.
const MAX_DECIMAL_SCALE: u8 = 19;

/// Knobs that change generated DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// Table that `created-by`, `modified-by` and `user` fields reference
    pub users_table: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            users_table: DEFAULT_USERS_TABLE.to_string(),
        }
    }
}

/// Result of mapping one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Physical(ColumnSpec),
    /// Resolved at query time; no backing column
    Virtual,
}

/// Inline `REFERENCES` target.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub table: String,
    pub on_delete: Option<ReferentialAction>,
}

/// A column definition inside `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
    pub not_null: bool,
    pub unique: bool,
    /// Already-rendered SQL expression
    pub default: Option<String>,
    pub references: Option<Reference>,
    /// Inline CHECK expression, without the `CHECK` keyword
    pub check: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            unique: false,
            default: None,
            references: None,
            check: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn references(
        mut self,
        table: impl Into<String>,
        on_delete: Option<ReferentialAction>,
    ) -> Self {
        self.references = Some(Reference {
            table: table.into(),
            on_delete,
        });
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Render as `"name" TYPE [NOT NULL] [UNIQUE] [DEFAULT x] [REFERENCES ..] [CHECK (..)]`.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.sql_type);
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if let Some(reference) = &self.references {
            sql.push_str(&format!(" REFERENCES {}(id)", quote_ident(&reference.table)));
            if let Some(action) = reference.on_delete {
                sql.push_str(" ON DELETE ");
                sql.push_str(action.as_sql());
            }
        }
        if let Some(check) = &self.check {
            sql.push_str(&format!(" CHECK ({check})"));
        }
        sql
    }
}

/// Render a JSON default as a SQL literal.
///
/// Booleans and numbers are emitted bare, strings are single-quoted with
/// embedded quotes doubled, anything else becomes `NULL`.
pub fn format_default(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        _ => "NULL".to_string(),
    }
}

fn in_list_check(column: &str, options: &[String]) -> String {
    let list: Vec<String> = options.iter().map(|o| quote_literal(o)).collect();
    format!("{} IN ({})", quote_ident(column), list.join(", "))
}

fn range_check(column: &str, min: Option<i64>, max: Option<i64>) -> Option<String> {
    let col = quote_ident(column);
    match (min, max) {
        (Some(min), Some(max)) => Some(format!("{col} BETWEEN {min} AND {max}")),
        (Some(min), None) => Some(format!("{col} >= {min}")),
        (None, Some(max)) => Some(format!("{col} <= {max}")),
        (None, None) => None,
    }
}

fn check_range(
    table: &Table,
    field: &Field,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<(), CompileError> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(CompileError::InvalidRange {
                table: table.name.clone(),
                field: field.name.clone(),
                min,
                max,
            });
        }
    }
    Ok(())
}

fn require_options(table: &Table, field: &Field, options: &[String]) -> Result<(), CompileError> {
    if options.is_empty() {
        return Err(CompileError::MissingOptions {
            table: table.name.clone(),
            field: field.name.clone(),
            type_name: field.kind.type_name().to_string(),
        });
    }
    Ok(())
}

/// Map one field of `table` to its column.
pub fn compile_field(
    table: &Table,
    field: &Field,
    opts: &CompileOptions,
) -> Result<Column, CompileError> {
    if field.kind.is_virtual() {
        return Ok(Column::Virtual);
    }
    validate_identifier(&field.name, IdentifierKind::Field)?;

    let name = field.name.as_str();
    let mut spec = match &field.kind {
        FieldKind::SingleLineText
        | FieldKind::LongText
        | FieldKind::RichText
        | FieldKind::Email
        | FieldKind::Url
        | FieldKind::PhoneNumber
        | FieldKind::Barcode
        | FieldKind::SingleAttachment => ColumnSpec::new(name, "TEXT"),

        FieldKind::Integer { min, max } => {
            check_range(table, field, *min, *max)?;
            let spec = ColumnSpec::new(name, "INTEGER");
            match range_check(name, *min, *max) {
                Some(check) => spec.check(check),
                None => spec,
            }
        }
        FieldKind::Decimal { precision } => {
            let scale = precision.unwrap_or(4);
            if scale > MAX_DECIMAL_SCALE {
                return Err(CompileError::InvalidPrecision {
                    table: table.name.clone(),
                    field: field.name.clone(),
                    precision: scale,
                    max: MAX_DECIMAL_SCALE,
                });
            }
            ColumnSpec::new(name, format!("NUMERIC({MAX_DECIMAL_SCALE},{scale})"))
        }
        FieldKind::Currency { .. } => ColumnSpec::new(name, "NUMERIC(19,4)"),
        FieldKind::Percentage => ColumnSpec::new(name, "NUMERIC(5,2)"),
        FieldKind::Rating { min, max } => {
            let (min, max) = (min.unwrap_or(1), max.unwrap_or(5));
            check_range(table, field, Some(min), Some(max))?;
            ColumnSpec::new(name, "INTEGER").check(format!(
                "{} BETWEEN {min} AND {max}",
                quote_ident(name)
            ))
        }
        FieldKind::Autonumber => ColumnSpec::new(name, "SERIAL"),

        FieldKind::Date | FieldKind::Datetime => ColumnSpec::new(name, "TIMESTAMP WITH TIME ZONE"),
        FieldKind::CreatedTime | FieldKind::ModifiedTime => {
            ColumnSpec::new(name, "TIMESTAMP WITH TIME ZONE")
                .not_null()
                .default("CURRENT_TIMESTAMP")
        }
        FieldKind::Time => ColumnSpec::new(name, "TIME"),
        FieldKind::Duration => ColumnSpec::new(name, "INTERVAL"),
        FieldKind::Checkbox => ColumnSpec::new(name, "BOOLEAN"),

        FieldKind::SingleSelect { options } | FieldKind::Status { options } => {
            require_options(table, field, options)?;
            ColumnSpec::new(name, "TEXT").check(in_list_check(name, options))
        }
        FieldKind::MultiSelect { options } => {
            require_options(table, field, options)?;
            ColumnSpec::new(name, "TEXT[]")
        }
        FieldKind::MultipleAttachments | FieldKind::Array => ColumnSpec::new(name, "TEXT[]"),
        FieldKind::Color => ColumnSpec::new(name, "TEXT")
            .check(format!("{} ~ '^#[0-9a-fA-F]{{6}}$'", quote_ident(name))),
        FieldKind::Json => ColumnSpec::new(name, "JSONB"),
        FieldKind::Geolocation => ColumnSpec::new(name, "POINT"),

        FieldKind::LinkedRecord { related_table } => {
            validate_identifier(related_table, IdentifierKind::Table)?;
            ColumnSpec::new(name, "INTEGER").references(related_table, None)
        }
        FieldKind::Relationship {
            related_table,
            on_delete,
        } => {
            validate_identifier(related_table, IdentifierKind::Table)?;
            ColumnSpec::new(name, "INTEGER").references(related_table, *on_delete)
        }
        FieldKind::CreatedBy | FieldKind::ModifiedBy | FieldKind::User => {
            ColumnSpec::new(name, "INTEGER").references(&opts.users_table, None)
        }

        FieldKind::Formula { .. }
        | FieldKind::Rollup { .. }
        | FieldKind::Lookup { .. }
        | FieldKind::Count { .. }
        | FieldKind::Button { .. } => return Ok(Column::Virtual),
    };

    if field.required {
        spec.not_null = true;
    }
    if field.unique {
        spec.unique = true;
    }
    if let Some(value) = &field.default {
        spec.default = Some(format_default(value));
    }
    Ok(Column::Physical(spec))
}

/// Whether a field gets an automatic `idx_<table>_<field>` index.
pub fn wants_index(field: &Field) -> bool {
    field.indexed
        || matches!(
            field.kind,
            FieldKind::Email
                | FieldKind::LinkedRecord { .. }
                | FieldKind::Relationship { .. }
                | FieldKind::SingleSelect { .. }
        )
}
