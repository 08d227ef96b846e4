//! Error taxonomy for schema compilation and migration.
//!
//! Three kinds of failure exist and all of them end the run:
//! - [`ValidationError`]: the schema is inconsistent (bad references, cycles, views).
//! - [`CompileError`]: a field or table cannot be turned into a column.
//! - [`ExecutionError`]: the database rejected part of the migration.

use std::fmt;

use thiserror::Error;

/// A schema inconsistency found before any SQL is generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("table '{table}': {message} (at {})", display_path(.path))]
pub struct ValidationError {
    /// Table the offending subtree belongs to
    pub table: String,
    /// Human-readable description
    pub message: String,
    /// Path inside the table definition, e.g. `["primaryKey", "fields"]`
    pub path: Vec<String>,
}

impl ValidationError {
    pub fn new<P, S>(table: impl Into<String>, message: impl Into<String>, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            message: message.into(),
            path: path.into_iter().map(Into::into).collect(),
        }
    }
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<table>".to_string()
    } else {
        path.join(".")
    }
}

/// Which kind of name failed identifier rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Field,
    Index,
    Constraint,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Table => write!(f, "table"),
            IdentifierKind::Field => write!(f, "field"),
            IdentifierKind::Index => write!(f, "index"),
            IdentifierKind::Constraint => write!(f, "constraint"),
        }
    }
}

/// A field or table that cannot be compiled to a column definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The `type` string names no known field type
    #[error("table '{table}': field '{field}' has unknown type '{type_name}'")]
    UnknownFieldType {
        table: String,
        field: String,
        type_name: String,
    },

    /// A name that PostgreSQL cannot take as an identifier
    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidIdentifier {
        kind: IdentifierKind,
        name: String,
        reason: String,
    },

    /// A select-like field declared without options
    #[error("table '{table}': field '{field}' of type '{type_name}' requires at least one option")]
    MissingOptions {
        table: String,
        field: String,
        type_name: String,
    },

    /// min greater than max on a bounded numeric field
    #[error("table '{table}': field '{field}' has min {min} greater than max {max}")]
    InvalidRange {
        table: String,
        field: String,
        min: i64,
        max: i64,
    },

    /// Decimal scale outside what `NUMERIC(19,p)` accepts
    #[error("table '{table}': field '{field}' has precision {precision}, at most {max} is allowed")]
    InvalidPrecision {
        table: String,
        field: String,
        precision: u8,
        max: u8,
    },

    /// Input is not shaped like a list of tables
    #[error("malformed schema: {0}")]
    MalformedSchema(String),
}

/// Step of the migration protocol a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Begin,
    Execute,
    Track,
    Commit,
    Rollback,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Begin => write!(f, "BEGIN"),
            Phase::Execute => write!(f, "EXECUTE"),
            Phase::Track => write!(f, "TRACK"),
            Phase::Commit => write!(f, "COMMIT"),
            Phase::Rollback => write!(f, "ROLLBACK"),
        }
    }
}

/// Error reported by the database connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", display_code(.code))]
pub struct DatabaseError {
    /// SQLSTATE, when the server sent one
    pub code: Option<String>,
    pub message: String,
}

fn display_code(code: &Option<String>) -> String {
    code.as_ref().map(|c| format!("[{c}] ")).unwrap_or_default()
}

impl DatabaseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) => Self {
                code: db.code().map(|c| c.into_owned()),
                message: db.message().to_string(),
            },
            None => Self::new(e.to_string()),
        }
    }
}

/// A failed migration step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("migration failed during {phase}: {cause}")]
pub struct ExecutionError {
    pub phase: Phase,
    /// Statement that was running when the failure happened
    pub sql: Option<String>,
    pub cause: DatabaseError,
    /// Original failure when the rollback that followed it also failed
    pub trigger: Option<DatabaseError>,
}

impl ExecutionError {
    pub fn new(phase: Phase, sql: Option<String>, cause: DatabaseError) -> Self {
        Self {
            phase,
            sql,
            cause,
            trigger: None,
        }
    }
}

/// Any error that ends a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Reading or preparing bookkeeping state failed before the transaction
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("schema serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Whether the failure is the schema author's to fix (as opposed to the database's).
    pub fn is_schema_error(&self) -> bool {
        matches!(self, MigrateError::Validation(_) | MigrateError::Compile(_))
    }
}

pub type MigrateResult<T> = Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("users", "duplicate field", ["primaryKey", "fields"]);
        assert_eq!(
            err.to_string(),
            "table 'users': duplicate field (at primaryKey.fields)"
        );
    }

    #[test]
    fn test_database_error_display_with_code() {
        let err = DatabaseError::with_code("42601", "syntax error at or near \"bad\"");
        assert_eq!(err.to_string(), "[42601] syntax error at or near \"bad\"");
        assert_eq!(DatabaseError::new("closed").to_string(), "closed");
    }

    #[test]
    fn test_schema_error_classification() {
        let v: MigrateError = ValidationError::new("t", "m", Vec::<String>::new()).into();
        assert!(v.is_schema_error());
        let e: MigrateError =
            ExecutionError::new(Phase::Commit, None, DatabaseError::new("lost")).into();
        assert!(!e.is_schema_error());
        assert_eq!(e.to_string(), "migration failed during COMMIT: lost");
    }
}
