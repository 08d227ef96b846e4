use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A field definition: shared attributes plus the type-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Every field type, tagged by its `type` string.
///
/// Adding a variant forces every exhaustive match (type names, column
/// mapping, filter compatibility) to be revisited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum FieldKind {
    SingleLineText,
    LongText,
    RichText,
    Email,
    Url,
    PhoneNumber,
    Barcode,
    SingleAttachment,
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Decimal {
        /// Digits after the decimal point
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u8>,
    },
    Currency {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
    },
    Percentage,
    Rating {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Autonumber,
    Date,
    Datetime,
    Time,
    Duration,
    CreatedTime,
    ModifiedTime,
    Checkbox,
    SingleSelect {
        options: Vec<String>,
    },
    Status {
        options: Vec<String>,
    },
    MultiSelect {
        options: Vec<String>,
    },
    MultipleAttachments,
    Array,
    Color,
    Json,
    Geolocation,
    LinkedRecord {
        related_table: String,
    },
    Relationship {
        related_table: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_delete: Option<ReferentialAction>,
    },
    CreatedBy,
    ModifiedBy,
    User,
    Formula {
        formula: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_type: Option<String>,
    },
    Rollup {
        relationship_field: String,
        related_field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aggregation: Option<String>,
    },
    Lookup {
        relationship_field: String,
        related_field: String,
    },
    Count {
        relationship_field: String,
    },
    Button {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

/// All recognized `type` strings.
pub const FIELD_TYPES: &[&str] = &[
    "single-line-text",
    "long-text",
    "rich-text",
    "email",
    "url",
    "phone-number",
    "barcode",
    "single-attachment",
    "integer",
    "decimal",
    "currency",
    "percentage",
    "rating",
    "autonumber",
    "date",
    "datetime",
    "time",
    "duration",
    "created-time",
    "modified-time",
    "checkbox",
    "single-select",
    "status",
    "multi-select",
    "multiple-attachments",
    "array",
    "color",
    "json",
    "geolocation",
    "linked-record",
    "relationship",
    "created-by",
    "modified-by",
    "user",
    "formula",
    "rollup",
    "lookup",
    "count",
    "button",
];

impl FieldKind {
    /// The `type` string this variant is tagged with.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::SingleLineText => "single-line-text",
            FieldKind::LongText => "long-text",
            FieldKind::RichText => "rich-text",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::PhoneNumber => "phone-number",
            FieldKind::Barcode => "barcode",
            FieldKind::SingleAttachment => "single-attachment",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Decimal { .. } => "decimal",
            FieldKind::Currency { .. } => "currency",
            FieldKind::Percentage => "percentage",
            FieldKind::Rating { .. } => "rating",
            FieldKind::Autonumber => "autonumber",
            FieldKind::Date => "date",
            FieldKind::Datetime => "datetime",
            FieldKind::Time => "time",
            FieldKind::Duration => "duration",
            FieldKind::CreatedTime => "created-time",
            FieldKind::ModifiedTime => "modified-time",
            FieldKind::Checkbox => "checkbox",
            FieldKind::SingleSelect { .. } => "single-select",
            FieldKind::Status { .. } => "status",
            FieldKind::MultiSelect { .. } => "multi-select",
            FieldKind::MultipleAttachments => "multiple-attachments",
            FieldKind::Array => "array",
            FieldKind::Color => "color",
            FieldKind::Json => "json",
            FieldKind::Geolocation => "geolocation",
            FieldKind::LinkedRecord { .. } => "linked-record",
            FieldKind::Relationship { .. } => "relationship",
            FieldKind::CreatedBy => "created-by",
            FieldKind::ModifiedBy => "modified-by",
            FieldKind::User => "user",
            FieldKind::Formula { .. } => "formula",
            FieldKind::Rollup { .. } => "rollup",
            FieldKind::Lookup { .. } => "lookup",
            FieldKind::Count { .. } => "count",
            FieldKind::Button { .. } => "button",
        }
    }

    /// Virtual fields have no backing column.
    pub fn is_virtual(&self) -> bool {
        matches!(
            self,
            FieldKind::Formula { .. }
                | FieldKind::Rollup { .. }
                | FieldKind::Lookup { .. }
                | FieldKind::Count { .. }
                | FieldKind::Button { .. }
        )
    }

    /// Relationship field a computed field aggregates through, if any.
    pub fn relationship_field(&self) -> Option<&str> {
        match self {
            FieldKind::Rollup {
                relationship_field, ..
            }
            | FieldKind::Lookup {
                relationship_field, ..
            }
            | FieldKind::Count { relationship_field } => Some(relationship_field),
            _ => None,
        }
    }
}

/// ON DELETE / ON UPDATE behavior for references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

impl Field {
    pub fn new(id: i64, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id,
            name: name.into(),
            required: false,
            unique: false,
            indexed: false,
            default: None,
            kind,
        }
    }

    /// Builder: mark NOT NULL.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder: mark UNIQUE.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Builder: request an index.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Builder: set the default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}
