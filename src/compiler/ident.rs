//! PostgreSQL identifier rules and quoting.

use crate::error::{CompileError, IdentifierKind};

/// Longest identifier PostgreSQL keeps without truncation (NAMEDATALEN - 1).
const MAX_IDENTIFIER_BYTES: usize = 63;

/// Keywords PostgreSQL reserves outright or allows only as function/type names.
pub const PG_RESERVED_WORDS: &[&str] = &[
    // reserved
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC", "BOTH",
    "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_CATALOG",
    "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "DEFAULT", "DEFERRABLE", "DESC", "DISTINCT", "DO", "ELSE", "END", "EXCEPT", "FALSE",
    "FETCH", "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INITIALLY",
    "INTERSECT", "INTO", "LATERAL", "LEADING", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NOT",
    "NULL", "OFFSET", "ON", "ONLY", "OR", "ORDER", "PLACING", "PRIMARY", "REFERENCES",
    "RETURNING", "SELECT", "SESSION_USER", "SOME", "SYMMETRIC", "SYSTEM_USER", "TABLE",
    "THEN", "TO", "TRAILING", "TRUE", "UNION", "UNIQUE", "USER", "USING", "VARIADIC", "WHEN",
    "WHERE", "WINDOW", "WITH",
    // reserved, function or type names only
    "AUTHORIZATION", "BINARY", "COLLATION", "CONCURRENTLY", "CROSS", "CURRENT_SCHEMA",
    "FREEZE", "FULL", "ILIKE", "INNER", "IS", "ISNULL", "JOIN", "LEFT", "LIKE", "NATURAL",
    "NOTNULL", "OUTER", "OVERLAPS", "RIGHT", "SIMILAR", "TABLESAMPLE", "VERBOSE",
];

fn invalid(kind: IdentifierKind, name: &str, reason: impl Into<String>) -> CompileError {
    CompileError::InvalidIdentifier {
        kind,
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Check that `name` can be used as a table, column, index or constraint name.
pub fn validate_identifier(name: &str, kind: IdentifierKind) -> Result<(), CompileError> {
    let Some(first) = name.chars().next() else {
        return Err(invalid(kind, name, "name is empty"));
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid(kind, name, "must start with a letter or underscore"));
    }
    if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(invalid(kind, name, format!("contains illegal character '{c}'")));
    }
    if name.len() > MAX_IDENTIFIER_BYTES {
        return Err(invalid(
            kind,
            name,
            format!("longer than {MAX_IDENTIFIER_BYTES} bytes"),
        ));
    }
    if PG_RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name)) {
        return Err(invalid(kind, name, "is a PostgreSQL reserved word"));
    }
    Ok(())
}

/// Double-quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
