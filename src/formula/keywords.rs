//! Words that never name a field inside a formula or CHECK expression.

/// Reserved vocabulary, upper-case. Matching is ASCII case-insensitive.
pub const RESERVED_WORDS: &[&str] = &[
    // Clauses
    "SELECT", "FROM", "WHERE", "AS", "ON", "IN", "IS", "BETWEEN", "LIKE", "ILIKE", "SIMILAR",
    "ESCAPE", "DISTINCT", "ALL", "ANY", "SOME", "EXISTS", "ORDER", "BY", "GROUP", "HAVING",
    "LIMIT", "OFFSET", "ASC", "DESC", "NULLS", "FIRST", "LAST", "TO", "FOR", "OVER",
    "PARTITION", "FILTER", "WITHIN", "AT", "ZONE", "INTERVAL",
    // Logic and literals
    "AND", "OR", "NOT", "XOR", "TRUE", "FALSE", "NULL", "UNKNOWN",
    // Control flow
    "CASE", "WHEN", "THEN", "ELSE", "END", "IF", "IIF", "COALESCE", "NULLIF", "GREATEST",
    "LEAST",
    // String functions
    "CONCAT", "CONCAT_WS", "UPPER", "LOWER", "TRIM", "LTRIM", "RTRIM", "BTRIM", "LENGTH",
    "CHAR_LENGTH", "SUBSTRING", "SUBSTR", "LEFT", "RIGHT", "REPLACE", "POSITION", "STRPOS",
    "LPAD", "RPAD", "REPEAT", "REVERSE", "SPLIT_PART", "INITCAP", "FORMAT", "TRANSLATE",
    "ASCII", "CHR", "MD5", "STARTS_WITH",
    // Math
    "ABS", "CEIL", "CEILING", "FLOOR", "ROUND", "TRUNC", "MOD", "POWER", "POW", "SQRT", "CBRT",
    "EXP", "LN", "LOG", "LOG10", "SIGN", "PI", "RANDOM", "DIV", "WIDTH_BUCKET",
    // Aggregates
    "SUM", "AVG", "COUNT", "MIN", "MAX", "STRING_AGG", "ARRAY_AGG", "BOOL_AND", "BOOL_OR",
    "EVERY",
    // Date and time
    "NOW", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "LOCALTIME", "LOCALTIMESTAMP",
    "EXTRACT", "DATE_PART", "DATE_TRUNC", "AGE", "MAKE_DATE", "MAKE_TIME", "MAKE_INTERVAL",
    "TO_CHAR", "TO_DATE", "TO_TIMESTAMP", "TO_NUMBER", "YEAR", "MONTH", "WEEK", "DAY", "HOUR",
    "MINUTE", "SECOND", "EPOCH", "DOW", "DOY", "QUARTER",
    // Casts
    "CAST", "TRY_CAST", "CONVERT",
    // Data types
    "TEXT", "VARCHAR", "CHAR", "CHARACTER", "VARYING", "INTEGER", "INT", "INT2", "INT4", "INT8",
    "SMALLINT", "BIGINT", "NUMERIC", "DECIMAL", "REAL", "DOUBLE", "PRECISION", "FLOAT",
    "FLOAT4", "FLOAT8", "BOOLEAN", "BOOL", "DATE", "TIME", "TIMESTAMP", "TIMESTAMPTZ", "WITH",
    "WITHOUT", "JSON", "JSONB", "UUID", "BYTEA", "SERIAL", "BIGSERIAL", "MONEY",
    // Arrays
    "ARRAY", "ARRAY_LENGTH", "ARRAY_POSITION", "ARRAY_TO_STRING", "STRING_TO_ARRAY",
    "UNNEST", "CARDINALITY", "ARRAY_APPEND", "ARRAY_REMOVE",
    // Regex
    "REGEXP_MATCH", "REGEXP_MATCHES", "REGEXP_REPLACE", "REGEXP_SPLIT_TO_ARRAY",
    // Binary
    "ENCODE", "DECODE", "SHA256", "GET_BYTE", "SET_BYTE",
];

/// Whether `word` belongs to the reserved vocabulary.
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word))
}
