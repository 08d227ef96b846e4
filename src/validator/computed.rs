use crate::error::ValidationError;
use crate::schema::{FieldKind, Table};

/// Count, rollup and lookup fields must aggregate through a `relationship` field.
pub(super) fn validate_computed_fields(table: &Table) -> Result<(), ValidationError> {
    for (i, field) in table.fields.iter().enumerate() {
        let Some(relationship) = field.kind.relationship_field() else {
            continue;
        };
        let at = vec![
            "fields".to_string(),
            i.to_string(),
            "relationshipField".to_string(),
        ];
        match table.find_field(relationship) {
            None => {
                return Err(ValidationError::new(
                    &table.name,
                    format!(
                        "{} field '{}' references non-existent relationship field '{}'",
                        field.kind.type_name(),
                        field.name,
                        relationship
                    ),
                    at,
                ));
            }
            Some(target) if !matches!(target.kind, FieldKind::Relationship { .. }) => {
                return Err(ValidationError::new(
                    &table.name,
                    format!(
                        "{} field '{}' requires '{}' to be a relationship field, found '{}'",
                        field.kind.type_name(),
                        field.name,
                        relationship,
                        target.kind.type_name()
                    ),
                    at,
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
