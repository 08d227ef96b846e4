//! DDL assembly: one `CREATE TABLE IF NOT EXISTS` per table, its indexes,
//! then idempotent foreign-key blocks once every table exists.

use super::{
    Column, CompileOptions, compile_field, order_tables, quote_ident, quote_literal,
    validate_identifier, wants_index,
};
use crate::error::{CompileError, IdentifierKind};
use crate::schema::{ForeignKey, PrimaryKey, Table, is_special_field};

/// Ordered statements for one migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    pub statements: Vec<String>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Render as a script, one statement per paragraph.
    pub fn to_sql(&self) -> String {
        self.statements
            .iter()
            .map(|s| format!("{s};"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Compile a whole schema.
///
/// Tables are emitted in reference order; table-level foreign keys come
/// last so they may point at any table in the schema.
pub fn compile_schema(
    tables: &[Table],
    opts: &CompileOptions,
) -> Result<MigrationPlan, CompileError> {
    let mut statements = Vec::new();
    let mut foreign_keys = Vec::new();
    for table in order_tables(tables, opts) {
        statements.extend(compile_table(table, opts)?);
        foreign_keys.extend(foreign_key_statements(table)?);
    }
    statements.extend(foreign_keys);
    Ok(MigrationPlan { statements })
}

fn column_list(fields: &[String]) -> String {
    fields.iter().map(|f| quote_ident(f)).collect::<Vec<_>>().join(", ")
}

fn system_id_column(table: &Table) -> &'static str {
    match &table.primary_key {
        None | Some(PrimaryKey::Simple { field: None }) => "\"id\" SERIAL PRIMARY KEY",
        Some(PrimaryKey::Simple { field: Some(f) }) if f == "id" => "\"id\" SERIAL PRIMARY KEY",
        Some(_) => "\"id\" SERIAL UNIQUE",
    }
}

/// Table-level PRIMARY KEY clause, if the key is not the system `id` column.
fn primary_key_clause(table: &Table, declares_id: bool) -> Option<String> {
    match &table.primary_key {
        Some(PrimaryKey::Simple { field: Some(f) }) if f != "id" || declares_id => {
            Some(format!("PRIMARY KEY ({})", quote_ident(f)))
        }
        Some(PrimaryKey::Composite { fields }) => {
            Some(format!("PRIMARY KEY ({})", column_list(fields)))
        }
        None | Some(PrimaryKey::Simple { field: None }) if declares_id => {
            Some("PRIMARY KEY (\"id\")".to_string())
        }
        _ => None,
    }
}

/// `CREATE TABLE` plus the table's indexes.
pub fn compile_table(table: &Table, opts: &CompileOptions) -> Result<Vec<String>, CompileError> {
    validate_identifier(&table.name, IdentifierKind::Table)?;
    let declares = |name: &str| table.find_field(name).is_some();

    let mut lines: Vec<String> = Vec::new();
    if !declares("id") {
        lines.push(system_id_column(table).to_string());
    }
    for field in &table.fields {
        if let Column::Physical(spec) = compile_field(table, field, opts)? {
            lines.push(spec.to_sql());
        }
    }
    for name in ["created_at", "updated_at"] {
        if !declares(name) {
            lines.push(format!(
                "{} TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP",
                quote_ident(name)
            ));
        }
    }
    if !declares("deleted_at") {
        lines.push("\"deleted_at\" TIMESTAMP WITH TIME ZONE".to_string());
    }

    if let Some(pk) = primary_key_clause(table, declares("id")) {
        lines.push(pk);
    }
    for unique in &table.unique_constraints {
        validate_identifier(&unique.name, IdentifierKind::Constraint)?;
        lines.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quote_ident(&unique.name),
            column_list(&unique.fields)
        ));
    }
    for check in &table.constraints {
        validate_identifier(&check.name, IdentifierKind::Constraint)?;
        lines.push(format!(
            "CONSTRAINT {} CHECK ({})",
            quote_ident(&check.name),
            check.check
        ));
    }

    let table_ident = quote_ident(&table.name);
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        table_ident,
        lines.join(",\n  ")
    )];

    for (i, index_name) in auto_index_names(table) {
        let field = &table.fields[i];
        validate_identifier(&index_name, IdentifierKind::Index)?;
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(&index_name),
            table_ident,
            quote_ident(&field.name)
        ));
    }

    for index in &table.indexes {
        validate_identifier(&index.name, IdentifierKind::Index)?;
        statements.push(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            quote_ident(&index.name),
            table_ident,
            column_list(&index.fields)
        ));
    }

    Ok(statements)
}

/// Automatic `idx_<table>_<field>` names, keyed by field position.
pub fn auto_index_names(table: &Table) -> Vec<(usize, String)> {
    table
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.kind.is_virtual() && !is_special_field(&f.name) && wants_index(f))
        .map(|(i, f)| (i, format!("idx_{}_{}", table.name, f.name)))
        .collect()
}

fn foreign_key_block(table: &Table, fk: &ForeignKey) -> Result<String, CompileError> {
    validate_identifier(&fk.name, IdentifierKind::Constraint)?;
    validate_identifier(&fk.referenced_table, IdentifierKind::Table)?;

    let mut constraint = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_ident(&table.name),
        quote_ident(&fk.name),
        column_list(&fk.fields),
        quote_ident(&fk.referenced_table),
        column_list(&fk.referenced_fields)
    );
    if let Some(action) = fk.on_delete {
        constraint.push_str(" ON DELETE ");
        constraint.push_str(action.as_sql());
    }
    if let Some(action) = fk.on_update {
        constraint.push_str(" ON UPDATE ");
        constraint.push_str(action.as_sql());
    }

    // constraint names are only unique per table
    Ok(format!(
        "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_constraint \
         WHERE conname = {} AND conrelid = {}::regclass) THEN {}; END IF; END $$",
        quote_literal(&fk.name),
        quote_literal(&quote_ident(&table.name)),
        constraint
    ))
}

/// Guarded `ALTER TABLE .. ADD CONSTRAINT` blocks for table-level foreign keys.
pub fn foreign_key_statements(table: &Table) -> Result<Vec<String>, CompileError> {
    table
        .foreign_keys
        .iter()
        .map(|fk| foreign_key_block(table, fk))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        CheckConstraint, Field, FieldKind, IndexDef, ReferentialAction, UniqueConstraint,
    };
    use pretty_assertions::assert_eq;

    fn users() -> Table {
        Table::new("users").field(Field::new(1, "email", FieldKind::Email).required().unique())
    }

    #[test]
    fn test_users_table() {
        let statements = compile_table(&users(), &CompileOptions::default()).unwrap();
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE IF NOT EXISTS \"users\" (\n  \
                 \"id\" SERIAL PRIMARY KEY,\n  \
                 \"email\" TEXT NOT NULL UNIQUE,\n  \
                 \"created_at\" TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,\n  \
                 \"updated_at\" TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,\n  \
                 \"deleted_at\" TIMESTAMP WITH TIME ZONE\n)"
                    .to_string(),
                "CREATE INDEX IF NOT EXISTS \"idx_users_email\" ON \"users\" (\"email\")".to_string(),
            ]
        );
    }

    #[test]
    fn test_virtual_fields_have_no_column() {
        let table = Table::new("orders")
            .field(Field::new(1, "price", FieldKind::Currency { currency: None }))
            .field(Field::new(
                2,
                "total",
                FieldKind::Formula {
                    formula: "price * 2".into(),
                    result_type: None,
                },
            ));
        let create = &compile_table(&table, &CompileOptions::default()).unwrap()[0];
        assert!(create.contains("\"price\" NUMERIC(19,4)"));
        assert!(!create.contains("\"total\""));
    }

    #[test]
    fn test_composite_primary_key_keeps_serial_id() {
        let mut table = Table::new("members")
            .field(Field::new(1, "team_id", FieldKind::Integer { min: None, max: None }))
            .field(Field::new(2, "user_id", FieldKind::Integer { min: None, max: None }));
        table.primary_key = Some(PrimaryKey::Composite {
            fields: vec!["team_id".into(), "user_id".into()],
        });
        let create = &compile_table(&table, &CompileOptions::default()).unwrap()[0];
        assert!(create.contains("\"id\" SERIAL UNIQUE"));
        assert!(create.contains("PRIMARY KEY (\"team_id\", \"user_id\")"));
    }

    #[test]
    fn test_table_constraints_and_indexes() {
        let mut table = Table::new("products")
            .field(Field::new(1, "sku", FieldKind::SingleLineText))
            .field(Field::new(2, "qty", FieldKind::Integer { min: None, max: None }).indexed());
        table.unique_constraints.push(UniqueConstraint {
            name: "uq_products_sku".into(),
            fields: vec!["sku".into()],
        });
        table.constraints.push(CheckConstraint {
            name: "qty_positive".into(),
            check: "qty >= 0".into(),
        });
        table.indexes.push(IndexDef {
            name: "idx_products_sku_qty".into(),
            fields: vec!["sku".into(), "qty".into()],
            unique: true,
        });

        let statements = compile_table(&table, &CompileOptions::default()).unwrap();
        assert!(statements[0].contains("CONSTRAINT \"uq_products_sku\" UNIQUE (\"sku\")"));
        assert!(statements[0].contains("CONSTRAINT \"qty_positive\" CHECK (qty >= 0)"));
        assert_eq!(
            &statements[1..],
            [
                "CREATE INDEX IF NOT EXISTS \"idx_products_qty\" ON \"products\" (\"qty\")",
                "CREATE UNIQUE INDEX IF NOT EXISTS \"idx_products_sku_qty\" ON \"products\" (\"sku\", \"qty\")",
            ]
        );
    }

    #[test]
    fn test_declared_system_column_is_not_duplicated() {
        let table = Table::new("events").field(Field::new(1, "created_at", FieldKind::Datetime));
        let create = &compile_table(&table, &CompileOptions::default()).unwrap()[0];
        assert_eq!(create.matches("\"created_at\"").count(), 1);
    }

    #[test]
    fn test_foreign_keys_come_last() {
        let mut tasks = Table::new("tasks").field(Field::new(
            1,
            "project_id",
            FieldKind::Integer { min: None, max: None },
        ));
        tasks.foreign_keys.push(ForeignKey {
            name: "fk_tasks_project".into(),
            fields: vec!["project_id".into()],
            referenced_table: "projects".into(),
            referenced_fields: vec!["id".into()],
            on_delete: Some(ReferentialAction::Cascade),
            on_update: None,
        });
        let projects =
            Table::new("projects").field(Field::new(1, "title", FieldKind::SingleLineText));

        let plan = compile_schema(&[tasks, projects], &CompileOptions::default()).unwrap();
        let last = plan.statements.last().unwrap();
        assert_eq!(
            last,
            "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_constraint \
             WHERE conname = 'fk_tasks_project' AND conrelid = '\"tasks\"'::regclass) \
             THEN ALTER TABLE \"tasks\" ADD CONSTRAINT \"fk_tasks_project\" FOREIGN KEY (\"project_id\") \
             REFERENCES \"projects\" (\"id\") ON DELETE CASCADE; END IF; END $$"
        );
    }

    #[test]
    fn test_shared_foreign_key_name_is_guarded_per_table() {
        let owned = |name: &str| {
            let mut table = Table::new(name).field(Field::new(
                1,
                "owner_id",
                FieldKind::Integer { min: None, max: None },
            ));
            table.foreign_keys.push(ForeignKey {
                name: "fk_owner".into(),
                fields: vec!["owner_id".into()],
                referenced_table: "owners".into(),
                referenced_fields: vec!["id".into()],
                on_delete: None,
                on_update: None,
            });
            table
        };
        let owners = Table::new("owners").field(Field::new(1, "name", FieldKind::SingleLineText));
        let plan =
            compile_schema(&[owners, owned("cars"), owned("boats")], &CompileOptions::default())
                .unwrap();

        let guards: Vec<&String> =
            plan.statements.iter().filter(|s| s.starts_with("DO $$")).collect();
        assert_eq!(guards.len(), 2);
        assert!(guards[0].contains("conname = 'fk_owner' AND conrelid = '\"cars\"'::regclass"));
        assert!(guards[1].contains("conname = 'fk_owner' AND conrelid = '\"boats\"'::regclass"));
        assert!(guards[1].contains("ALTER TABLE \"boats\" ADD CONSTRAINT \"fk_owner\""));
    }

    #[test]
    fn test_auto_index_names() {
        let mut table = users().field(Field::new(
            2,
            "total",
            FieldKind::Formula {
                formula: "1 + 1".into(),
                result_type: None,
            },
        ));
        table.fields.push(Field::new(3, "nickname", FieldKind::SingleLineText).indexed());
        assert_eq!(
            auto_index_names(&table),
            [(0, "idx_users_email".to_string()), (2, "idx_users_nickname".to_string())]
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let tables = vec![users()];
        let a = compile_schema(&tables, &CompileOptions::default()).unwrap();
        let b = compile_schema(&tables, &CompileOptions::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.to_sql().ends_with("(\"email\");"));
    }

    #[test]
    fn test_reserved_table_name() {
        let table = Table::new("select").field(Field::new(1, "a", FieldKind::Checkbox));
        assert!(compile_table(&table, &CompileOptions::default()).is_err());
    }
}
