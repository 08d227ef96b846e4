//! View checks: ids, default view, field references and filter operators.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::schema::{FieldKind, Table, View};

/// Every operator a view filter may use.
pub const FILTER_OPERATORS: &[&str] = &[
    "equals",
    "notEquals",
    "contains",
    "notContains",
    "startsWith",
    "endsWith",
    "greaterThan",
    "greaterThanOrEqual",
    "lessThan",
    "lessThanOrEqual",
    "between",
    "before",
    "after",
    "onOrBefore",
    "onOrAfter",
    "in",
    "notIn",
    "isEmpty",
    "isNotEmpty",
    "isTrue",
    "isFalse",
];

/// Coarse grouping of field types for filter compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    Text,
    Numeric,
    Boolean,
    Date,
    Select,
    MultiValue,
    Reference,
    Opaque,
}

impl FieldCategory {
    pub fn of(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::SingleLineText
            | FieldKind::LongText
            | FieldKind::RichText
            | FieldKind::Email
            | FieldKind::Url
            | FieldKind::PhoneNumber
            | FieldKind::Barcode
            | FieldKind::SingleAttachment
            | FieldKind::Color => FieldCategory::Text,
            FieldKind::Integer { .. }
            | FieldKind::Decimal { .. }
            | FieldKind::Currency { .. }
            | FieldKind::Percentage
            | FieldKind::Rating { .. }
            | FieldKind::Autonumber
            | FieldKind::Duration
            | FieldKind::Count { .. } => FieldCategory::Numeric,
            FieldKind::Checkbox => FieldCategory::Boolean,
            FieldKind::Date
            | FieldKind::Datetime
            | FieldKind::Time
            | FieldKind::CreatedTime
            | FieldKind::ModifiedTime => FieldCategory::Date,
            FieldKind::SingleSelect { .. } | FieldKind::Status { .. } => FieldCategory::Select,
            FieldKind::MultiSelect { .. }
            | FieldKind::MultipleAttachments
            | FieldKind::Array => FieldCategory::MultiValue,
            FieldKind::LinkedRecord { .. }
            | FieldKind::Relationship { .. }
            | FieldKind::CreatedBy
            | FieldKind::ModifiedBy
            | FieldKind::User => FieldCategory::Reference,
            FieldKind::Json
            | FieldKind::Geolocation
            | FieldKind::Formula { .. }
            | FieldKind::Rollup { .. }
            | FieldKind::Lookup { .. }
            | FieldKind::Button { .. } => FieldCategory::Opaque,
        }
    }

    /// Category of a name that resolves on `table`, special fields included.
    pub fn of_name(table: &Table, name: &str) -> Option<Self> {
        match name {
            "id" => Some(FieldCategory::Numeric),
            "created_at" | "updated_at" | "deleted_at" => Some(FieldCategory::Date),
            _ => table.find_field(name).map(|f| Self::of(&f.kind)),
        }
    }

    fn operators(&self) -> &'static [&'static str] {
        match self {
            FieldCategory::Text => &[
                "equals", "notEquals", "contains", "notContains", "startsWith", "endsWith",
                "in", "notIn", "isEmpty", "isNotEmpty",
            ],
            FieldCategory::Numeric => &[
                "equals", "notEquals", "greaterThan", "greaterThanOrEqual", "lessThan",
                "lessThanOrEqual", "between", "in", "notIn", "isEmpty", "isNotEmpty",
            ],
            FieldCategory::Boolean => &["equals", "isTrue", "isFalse"],
            FieldCategory::Date => &[
                "equals", "notEquals", "before", "after", "onOrBefore", "onOrAfter", "between",
                "isEmpty", "isNotEmpty",
            ],
            FieldCategory::Select | FieldCategory::Reference => {
                &["equals", "notEquals", "in", "notIn", "isEmpty", "isNotEmpty"]
            }
            FieldCategory::MultiValue => &["contains", "notContains", "isEmpty", "isNotEmpty"],
            FieldCategory::Opaque => &["equals", "notEquals", "isEmpty", "isNotEmpty"],
        }
    }
}

/// Whether `operator` may filter a field of `category`.
pub fn operator_allowed(category: FieldCategory, operator: &str) -> bool {
    category.operators().contains(&operator)
}

fn at(view_index: usize, tail: &[&str]) -> Vec<String> {
    let mut out = vec!["views".to_string(), view_index.to_string()];
    out.extend(tail.iter().map(|s| s.to_string()));
    out
}

pub(super) fn validate_views(table: &Table) -> Result<(), ValidationError> {
    let mut ids = HashSet::new();
    for (i, view) in table.views.iter().enumerate() {
        if !ids.insert(view.id.as_str()) {
            return Err(ValidationError::new(
                &table.name,
                format!("Duplicate view id '{}'", view.id),
                at(i, &["id"]),
            ));
        }
    }

    let defaults = table.views.iter().filter(|v| v.is_default).count();
    if defaults > 1 {
        return Err(ValidationError::new(
            &table.name,
            format!("Only one view can be the default, found {defaults}"),
            ["views"],
        ));
    }

    for (i, view) in table.views.iter().enumerate() {
        validate_view(table, i, view)?;
    }
    Ok(())
}

fn unresolved(table: &Table, view: &View, name: &str, path: Vec<String>) -> ValidationError {
    ValidationError::new(
        &table.name,
        format!("View '{}' references non-existent field '{}'", view.id, name),
        path,
    )
}

fn validate_view(table: &Table, i: usize, view: &View) -> Result<(), ValidationError> {
    for (j, name) in view.fields.iter().enumerate() {
        if !table.resolves(name) {
            return Err(unresolved(table, view, name, at(i, &["fields", j.to_string().as_str()])));
        }
    }

    for (j, sort) in view.sorts.iter().enumerate() {
        if !table.resolves(&sort.field) {
            return Err(unresolved(
                table,
                view,
                &sort.field,
                at(i, &["sorts", j.to_string().as_str(), "field"]),
            ));
        }
    }

    if let Some(group) = &view.group_by {
        if !table.resolves(&group.field) {
            return Err(unresolved(table, view, &group.field, at(i, &["groupBy", "field"])));
        }
    }

    let Some(filters) = &view.filters else {
        return Ok(());
    };
    for (sub, condition) in filters.conditions() {
        let mut base = at(i, &["filters"]);
        base.extend(sub);

        let Some(category) = FieldCategory::of_name(table, &condition.field) else {
            let mut path = base;
            path.push("field".into());
            return Err(unresolved(table, view, &condition.field, path));
        };

        let mut path = base;
        path.push("operator".into());
        if !FILTER_OPERATORS.contains(&condition.operator.as_str()) {
            return Err(ValidationError::new(
                &table.name,
                format!(
                    "View '{}' uses unknown filter operator '{}'",
                    view.id, condition.operator
                ),
                path,
            ));
        }
        if !operator_allowed(category, &condition.operator) {
            let type_name = table
                .find_field(&condition.field)
                .map(|f| f.kind.type_name())
                .unwrap_or("system");
            return Err(ValidationError::new(
                &table.name,
                format!(
                    "Filter operator '{}' is not compatible with field '{}' of type '{}'",
                    condition.operator, condition.field, type_name
                ),
                path,
            ));
        }
    }
    Ok(())
}
