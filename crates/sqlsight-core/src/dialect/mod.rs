//! SQL dialect support

mod catalog;

use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect};
use std::str::FromStr;

pub use catalog::{DialectCatalog, FunctionInfo, Snippet};

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    PostgreSQL,
    MySQL,
    Db2,
}

impl SqlDialect {
    /// Get the sqlparser dialect for parsing
    pub fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::PostgreSQL => Box::new(PostgreSqlDialect {}),
            SqlDialect::MySQL => Box::new(MySqlDialect {}),
            SqlDialect::Db2 => Box::new(GenericDialect {}),
        }
    }

    /// Get default schema name for this dialect
    pub fn default_schema(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "public",
            SqlDialect::MySQL | SqlDialect::Db2 => "",
        }
    }

    /// Static keyword, function, type and snippet catalog for completion
    pub fn catalog(&self) -> &'static DialectCatalog {
        match self {
            SqlDialect::PostgreSQL => &catalog::POSTGRESQL,
            SqlDialect::MySQL => &catalog::MYSQL,
            SqlDialect::Db2 => &catalog::DB2,
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(SqlDialect::PostgreSQL),
            "mysql" | "mysql8" | "mariadb" => Ok(SqlDialect::MySQL),
            "db2" | "db2i" | "db2luw" => Ok(SqlDialect::Db2),
            _ => Err(format!(
                "Unknown dialect: '{}'. Supported dialects: postgresql, mysql, db2.",
                s
            )),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::PostgreSQL => write!(f, "postgresql"),
            SqlDialect::MySQL => write!(f, "mysql"),
            SqlDialect::Db2 => write!(f, "db2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_names_round_trip() {
        for dialect in [SqlDialect::PostgreSQL, SqlDialect::MySQL, SqlDialect::Db2] {
            assert_eq!(dialect.to_string().parse::<SqlDialect>(), Ok(dialect));
        }
        assert_eq!("PG".parse::<SqlDialect>(), Ok(SqlDialect::PostgreSQL));
        assert!("sqlite".parse::<SqlDialect>().is_err());
    }

    #[test]
    fn test_each_dialect_has_a_catalog() {
        for dialect in [SqlDialect::PostgreSQL, SqlDialect::MySQL, SqlDialect::Db2] {
            let catalog = dialect.catalog();
            assert!(!catalog.keywords.is_empty());
            assert!(!catalog.functions.is_empty());
            assert!(!catalog.data_types.is_empty());
            assert!(!catalog.snippets.is_empty());
        }
        assert!(SqlDialect::Db2.catalog().function("varchar_format").is_some());
        assert!(SqlDialect::MySQL.catalog().function("varchar_format").is_none());
    }
}
