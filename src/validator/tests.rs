use super::*;
use crate::schema::{
    CheckConstraint, Field, FieldKind, FieldPermission, FilterCondition, ForeignKey, IndexDef,
    PermissionRule, Permissions, PrimaryKey, SortDirection, UniqueConstraint, View, ViewFilter,
    ViewGroupBy, ViewSort,
};

fn text(id: i64, name: &str) -> Field {
    Field::new(id, name, FieldKind::SingleLineText)
}

fn formula(id: i64, name: &str, expr: &str) -> Field {
    Field::new(
        id,
        name,
        FieldKind::Formula {
            formula: expr.into(),
            result_type: None,
        },
    )
}

fn path(err: &ValidationError) -> Vec<&str> {
    err.path.iter().map(String::as_str).collect()
}

#[test]
fn test_formula_with_undeclared_references() {
    let table = Table::new("orders").field(formula(1, "total", "price * quantity"));
    let err = validate_schema(&[table]).unwrap_err();
    assert_eq!(
        err.message,
        "Formula field 'total' references undefined field 'price'"
    );
    assert_eq!(path(&err), ["fields", "0", "formula"]);
}

#[test]
fn test_formula_cycle_names_every_field() {
    let table = Table::new("t")
        .field(formula(1, "a", "b + 1"))
        .field(formula(2, "b", "a + 1"));
    let err = validate_table(&table).unwrap_err();
    assert!(err.message.contains("a -> b -> a"), "{}", err.message);
    assert_eq!(path(&err), ["fields"]);
}

#[test]
fn test_acyclic_formulas_pass() {
    let table = Table::new("t")
        .field(Field::new(1, "price", FieldKind::Decimal { precision: None }))
        .field(formula(2, "tax", "price * 0.2"))
        .field(formula(3, "gross", "price + tax"))
        .field(formula(4, "age", "NOW() - created_at"));
    assert!(validate_table(&table).is_ok());
}

#[test]
fn test_formula_syntax_runs_before_references() {
    let table = Table::new("t").field(formula(1, "bad", "missing + * 2"));
    let err = validate_table(&table).unwrap_err();
    assert!(err.message.starts_with("Invalid formula syntax"), "{}", err.message);
}

#[test]
fn test_empty_table_rejected() {
    let err = validate_table(&Table::new("empty")).unwrap_err();
    assert_eq!(path(&err), ["fields"]);
}

#[test]
fn test_duplicate_names() {
    let table = Table::new("t").field(text(1, "a")).field(text(2, "a"));
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["fields", "1", "name"]);

    let table = Table::new("t").field(text(1, "a")).field(text(1, "b"));
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["fields", "1", "id"]);

    let tables = [Table::new("t").field(text(1, "a")), Table::new("t").field(text(1, "a"))];
    let err = validate_schema(&tables).unwrap_err();
    assert_eq!(err.message, "Duplicate table name 't'");
}

#[test]
fn test_composite_primary_key_path() {
    let mut table = Table::new("t").field(text(1, "a"));
    table.primary_key = Some(PrimaryKey::Composite {
        fields: vec!["a".into(), "b".into()],
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["primaryKey", "fields"]);

    table.primary_key = Some(PrimaryKey::Composite {
        fields: vec!["a".into(), "a".into()],
    });
    let err = validate_table(&table).unwrap_err();
    assert!(err.message.contains("more than once"));
}

#[test]
fn test_check_constraint_unresolved_column() {
    let mut table = Table::new("t").field(Field::new(
        1,
        "qty",
        FieldKind::Integer {
            min: None,
            max: None,
        },
    ));
    table.constraints.push(CheckConstraint {
        name: "positive".into(),
        check: "qty > 0 AND price > 0".into(),
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["constraints", "0", "check"]);
    assert!(err.message.contains("'price'"));
}

fn view(id: &str) -> View {
    View {
        id: id.into(),
        name: None,
        is_default: false,
        fields: Vec::new(),
        filters: None,
        sorts: Vec::new(),
        group_by: None,
    }
}

#[test]
fn test_checkbox_rejects_contains() {
    let mut table = Table::new("tasks").field(Field::new(1, "done", FieldKind::Checkbox));
    let mut v = view("open");
    v.filters = Some(ViewFilter::Condition(FilterCondition {
        field: "done".into(),
        operator: "contains".into(),
        value: None,
    }));
    table.views.push(v);

    let err = validate_table(&table).unwrap_err();
    assert_eq!(
        err.message,
        "Filter operator 'contains' is not compatible with field 'done' of type 'checkbox'"
    );
    assert_eq!(path(&err), ["views", "0", "filters", "operator"]);
}

#[test]
fn test_nested_filter_path() {
    let mut table = Table::new("tasks").field(text(1, "title"));
    let mut v = view("v");
    v.filters = Some(ViewFilter::And {
        and: vec![
            ViewFilter::Condition(FilterCondition {
                field: "title".into(),
                operator: "contains".into(),
                value: None,
            }),
            ViewFilter::Condition(FilterCondition {
                field: "owner".into(),
                operator: "equals".into(),
                value: None,
            }),
        ],
    });
    table.views.push(v);

    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["views", "0", "filters", "and", "1", "field"]);
}

#[test]
fn test_two_default_views() {
    let mut table = Table::new("t").field(text(1, "a"));
    let mut first = view("one");
    first.is_default = true;
    let mut second = view("two");
    second.is_default = true;
    table.views = vec![first, second];

    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["views"]);
}

#[test]
fn test_organization_scope_requires_column() {
    let mut table = Table::new("t").field(text(1, "a"));
    table.permissions = Some(Permissions {
        organization_scoped: true,
        ..Default::default()
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["permissions", "organizationScoped"]);

    table.fields.push(Field::new(
        2,
        "organization_id",
        FieldKind::Integer {
            min: None,
            max: None,
        },
    ));
    assert!(validate_table(&table).is_ok());
}

#[test]
fn test_count_requires_relationship_field() {
    let table = Table::new("projects")
        .field(text(1, "client"))
        .field(Field::new(
            2,
            "task_count",
            FieldKind::Count {
                relationship_field: "client".into(),
            },
        ));
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["fields", "1", "relationshipField"]);

    let table = Table::new("projects")
        .field(Field::new(
            1,
            "client",
            FieldKind::Relationship {
                related_table: "clients".into(),
                on_delete: None,
            },
        ))
        .field(Field::new(
            2,
            "client_count",
            FieldKind::Count {
                relationship_field: "client".into(),
            },
        ));
    assert!(validate_table(&table).is_ok());
}

fn index(name: &str, fields: &[&str]) -> IndexDef {
    IndexDef {
        name: name.into(),
        fields: fields.iter().map(|f| f.to_string()).collect(),
        unique: false,
    }
}

#[test]
fn test_index_on_missing_or_virtual_column() {
    let mut table = Table::new("t")
        .field(text(1, "a"))
        .field(formula(2, "shout", "a"));
    table.indexes.push(index("idx_t_missing", &["missing"]));
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["indexes", "0", "fields"]);
    assert!(err.message.contains("'missing'"));

    table.indexes = vec![index("idx_t_shout", &["shout"])];
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["indexes", "0", "fields"]);
    assert!(err.message.contains("'shout'"));
}

#[test]
fn test_unique_constraint_on_missing_column() {
    let mut table = Table::new("t").field(text(1, "a"));
    table.unique_constraints.push(UniqueConstraint {
        name: "uq_t_b".into(),
        fields: vec!["b".into()],
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["uniqueConstraints", "0", "fields"]);
}

#[test]
fn test_duplicate_index_name_in_table() {
    let mut table = Table::new("t").field(text(1, "a")).field(text(2, "b"));
    table.indexes = vec![index("idx_t_pair", &["a"]), index("idx_t_pair", &["b"])];
    let err = validate_table(&table).unwrap_err();
    assert_eq!(err.message, "Duplicate index name 'idx_t_pair'");
    assert_eq!(path(&err), ["indexes", "1", "name"]);
}

#[test]
fn test_auto_index_names_collide_across_tables() {
    let tables = [
        Table::new("a_b").field(text(1, "c").indexed()),
        Table::new("a").field(text(1, "b_c").indexed()),
    ];
    let err = validate_schema(&tables).unwrap_err();
    assert_eq!(err.table, "a");
    assert_eq!(err.message, "Index name 'idx_a_b_c' is already used by table 'a_b'");
    assert_eq!(path(&err), ["fields", "0", "name"]);
}

#[test]
fn test_explicit_index_names_collide_across_tables() {
    let mut first = Table::new("first").field(text(1, "a"));
    first.indexes.push(index("idx_shared", &["a"]));
    let mut second = Table::new("second").field(text(1, "a"));
    second.unique_constraints.push(UniqueConstraint {
        name: "idx_shared".into(),
        fields: vec!["a".into()],
    });
    let err = validate_schema(&[first, second]).unwrap_err();
    assert_eq!(path(&err), ["uniqueConstraints", "0", "name"]);
}

fn owner_fk(name: &str) -> ForeignKey {
    ForeignKey {
        name: name.into(),
        fields: vec!["owner_id".into()],
        referenced_table: "owners".into(),
        referenced_fields: vec!["id".into()],
        on_delete: None,
        on_update: None,
    }
}

fn owned(name: &str) -> Table {
    let mut table = Table::new(name).field(Field::new(
        1,
        "owner_id",
        FieldKind::Integer {
            min: None,
            max: None,
        },
    ));
    table.foreign_keys.push(owner_fk("fk_owner"));
    table
}

#[test]
fn test_foreign_key_name_may_repeat_across_tables() {
    let tables = [Table::new("owners").field(text(1, "name")), owned("cars"), owned("boats")];
    assert!(validate_schema(&tables).is_ok());
}

#[test]
fn test_duplicate_constraint_name_in_table() {
    let mut table = owned("cars");
    table.unique_constraints.push(UniqueConstraint {
        name: "fk_owner".into(),
        fields: vec!["owner_id".into()],
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(err.message, "Duplicate constraint name 'fk_owner'");
    assert_eq!(path(&err), ["foreignKeys", "0", "name"]);
}

#[test]
fn test_owner_permission_on_missing_field() {
    let mut table = Table::new("t").field(text(1, "a"));
    table.permissions = Some(Permissions {
        read: Some(PermissionRule::Owner {
            field: "owner_id".into(),
        }),
        ..Default::default()
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["permissions", "read", "field"]);
}

#[test]
fn test_role_permission_needs_roles() {
    let mut table = Table::new("t").field(text(1, "a"));
    table.permissions = Some(Permissions {
        update: Some(PermissionRule::Roles { roles: Vec::new() }),
        ..Default::default()
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["permissions", "update", "roles"]);
}

#[test]
fn test_field_permission_entries() {
    let entry = |field: &str| FieldPermission {
        field: field.into(),
        read: Some(PermissionRule::Authenticated),
        write: None,
    };
    let mut table = Table::new("t").field(text(1, "a"));

    table.permissions = Some(Permissions {
        fields: vec![entry("ghost")],
        ..Default::default()
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["permissions", "fields", "0", "field"]);

    table.permissions = Some(Permissions {
        fields: vec![entry("a"), entry("a")],
        ..Default::default()
    });
    let err = validate_table(&table).unwrap_err();
    assert_eq!(err.message, "Duplicate permission entry for field 'a'");
    assert_eq!(path(&err), ["permissions", "fields", "1", "field"]);
}

#[test]
fn test_duplicate_view_id() {
    let mut table = Table::new("t").field(text(1, "a"));
    table.views = vec![view("grid"), view("grid")];
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["views", "1", "id"]);
}

#[test]
fn test_view_references() {
    let mut table = Table::new("t").field(text(1, "a"));

    let mut v = view("v");
    v.fields = vec!["a".into(), "b".into()];
    table.views = vec![v];
    let err = validate_table(&table).unwrap_err();
    assert_eq!(err.message, "View 'v' references non-existent field 'b'");
    assert_eq!(path(&err), ["views", "0", "fields", "1"]);

    let mut v = view("v");
    v.sorts = vec![ViewSort {
        field: "rank".into(),
        direction: SortDirection::Desc,
    }];
    table.views = vec![v];
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["views", "0", "sorts", "0", "field"]);

    let mut v = view("v");
    v.group_by = Some(ViewGroupBy {
        field: "team".into(),
        direction: SortDirection::Asc,
    });
    table.views = vec![v];
    let err = validate_table(&table).unwrap_err();
    assert_eq!(path(&err), ["views", "0", "groupBy", "field"]);
}
