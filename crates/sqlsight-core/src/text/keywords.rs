//! Reserved words used by the heuristics
//!
//! The shared core of the common dialects, not a full reserved-word list. A
//! word missing here is treated as an identifier; a word present here is
//! never validated as a column.

const KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BIGINT", "BOOLEAN", "BY", "CASE",
    "CAST", "CHAR", "CHARACTER", "CHECK", "COLLATE", "CONSTRAINT", "CREATE", "CROSS", "CURRENT",
    "CURRENT_DATE", "CURRENT_SCHEMA", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "DATE", "DAY", "DAYS", "DECIMAL", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DOUBLE", "DROP",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXISTS", "EXTRACT", "FALSE", "FETCH", "FIRST", "FLOAT",
    "FOLLOWING", "FOR", "FROM", "FULL", "GROUP", "HAVING", "HOUR", "HOURS", "ILIKE", "IN",
    "INNER", "INSERT", "INT", "INTEGER", "INTERSECT", "INTERVAL", "INTO", "IS", "JOIN", "LAST",
    "LATERAL", "LEFT", "LIKE", "LIMIT", "MATERIALIZED", "MERGE", "MINUTE", "MINUTES", "MONTH",
    "MONTHS", "NATURAL", "NEXT", "NOT", "NULL", "NULLS", "NUMERIC", "OF", "OFFSET", "ON", "ONLY",
    "OR", "ORDER", "OUTER", "OVER", "PARTITION", "PRECEDING", "RANGE", "RECURSIVE", "REAL",
    "RIGHT", "ROW", "ROWS", "SECOND", "SECONDS", "SELECT", "SESSION_USER", "SET", "SMALLINT",
    "SOME", "SYSDATE", "TABLE", "THEN", "TIME", "TIMESTAMP", "TO", "TOP", "TRUE", "TRUNCATE",
    "UNBOUNDED", "UNION", "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "VARCHAR", "VARYING",
    "WHEN", "WHERE", "WINDOW", "WITH", "WITHIN", "YEAR", "YEARS", "ZONE",
];

/// Keywords that start a new clause; an alias can never be one of these.
pub const CLAUSE_KEYWORDS: &[&str] = &[
    "CROSS", "EXCEPT", "FETCH", "FOR", "FROM", "FULL", "GROUP", "HAVING", "INNER", "INTERSECT",
    "JOIN", "LATERAL", "LEFT", "LIMIT", "MINUS", "NATURAL", "OFFSET", "ON", "ORDER", "OUTER",
    "RIGHT", "SELECT", "SET", "UNION", "USING", "VALUES", "WHERE", "WINDOW", "WITH",
];

/// Keywords after which a table name is expected.
pub const TABLE_KEYWORDS: &[&str] = &["FROM", "JOIN", "INTO", "UPDATE", "TABLE", "TRUNCATE"];

/// Functions whose argument list may contain a `FROM` that is not a table
/// source, as in `EXTRACT(YEAR FROM d)`.
pub const FROM_ARGUMENT_FUNCTIONS: &[&str] = &["EXTRACT", "SUBSTRING", "TRIM", "POSITION", "OVERLAY"];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

pub fn is_clause_keyword(word: &str) -> bool {
    CLAUSE_KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}
