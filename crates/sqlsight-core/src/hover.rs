//! Hover information for the symbol under the cursor

use serde::Serialize;
use tracing::debug;

use crate::dialect::SqlDialect;
use crate::error::Span;
use crate::schema::{Catalog, Column, Table};
use crate::scope::{Bindings, ColumnRef, Document, Lookup, ScopeResolver, Source};
use crate::structure::ParsedSubquery;
use crate::text::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hover {
    pub content: HoverContent,
    /// The hovered word
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HoverContent {
    #[serde(rename_all = "camelCase")]
    Column {
        name: String,
        /// `table NAME` or `subquery NAME`
        source: String,
        data_type: Option<String>,
        nullable: Option<bool>,
        primary_key: bool,
        description: Option<String>,
        /// Defining expression of an aliased subquery column
        expression: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Subquery { name: String, columns: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Table {
        name: String,
        schema: Option<String>,
        table_type: String,
        description: Option<String>,
        columns: Vec<Column>,
    },
    #[serde(rename_all = "camelCase")]
    Function {
        name: String,
        signature: String,
        description: String,
    },
}

impl HoverContent {
    fn table(table: &Table) -> Self {
        HoverContent::Table {
            name: table.name.clone(),
            schema: table.schema.clone(),
            table_type: table.kind_label().to_string(),
            description: table.description.clone(),
            columns: table.columns.clone(),
        }
    }

    fn subquery<'d>(resolver: &ScopeResolver<'d>, sq: &'d ParsedSubquery) -> Self {
        let (columns, _) = resolver.source_columns(Source::Subquery(sq));
        HoverContent::Subquery {
            name: sq.name.clone(),
            columns: columns.iter().map(|c| c.name().to_string()).collect(),
        }
    }

    fn column<'d>(resolver: &ScopeResolver<'d>, column: ColumnRef<'d>) -> Self {
        match column {
            ColumnRef::Table { table, column } => {
                Self::schema_column(column, &column.name, format!("table {}", table.name), None)
            }
            ColumnRef::Subquery {
                subquery,
                column: sq_column,
            } => {
                let source = format!("subquery {}", subquery.name);
                let expression = sq_column.expression.clone();
                match resolver.trace_to_table(column) {
                    Some((_, traced)) => {
                        Self::schema_column(traced, &sq_column.name, source, expression)
                    }
                    None => HoverContent::Column {
                        name: sq_column.name.clone(),
                        source,
                        data_type: None,
                        nullable: None,
                        primary_key: false,
                        description: None,
                        expression,
                    },
                }
            }
        }
    }

    /// Facts of a schema column, shown under `name`
    fn schema_column(
        column: &Column,
        name: &str,
        source: String,
        expression: Option<String>,
    ) -> Self {
        HoverContent::Column {
            name: name.to_string(),
            source,
            data_type: column.data_type.clone(),
            nullable: column.nullable,
            primary_key: column.is_primary_key == Some(true),
            description: column.description.clone(),
            expression,
        }
    }

    /// Markdown rendering for editors and the terminal
    pub fn to_markdown(&self) -> String {
        match self {
            HoverContent::Column {
                name,
                source,
                data_type,
                nullable,
                primary_key,
                description,
                expression,
            } => {
                let mut out = format!(
                    "**{}** `{}`",
                    name,
                    data_type.as_deref().unwrap_or("unknown")
                );
                if *primary_key {
                    out.push_str(" PK");
                }
                if *nullable == Some(false) {
                    out.push_str(" NOT NULL");
                }
                out.push_str(&format!("\n\n{}", source));
                if let Some(expression) = expression {
                    out.push_str(&format!("\n\n`{}`", expression));
                }
                if let Some(description) = description {
                    out.push_str(&format!("\n\n{}", description));
                }
                out
            }
            HoverContent::Subquery { name, columns } => {
                format!("**{}** (subquery)\n\n{}", name, columns.join(", "))
            }
            HoverContent::Table {
                name,
                schema,
                table_type,
                description,
                columns,
            } => {
                let mut out = match schema {
                    Some(schema) => format!("**{}.{}** ({})", schema, name, table_type),
                    None => format!("**{}** ({})", name, table_type),
                };
                if let Some(description) = description {
                    out.push_str(&format!("\n\n{}", description));
                }
                out.push('\n');
                for column in columns {
                    out.push_str(&format!("\n- {} `{}`", column.name, column.summary()));
                }
                out
            }
            HoverContent::Function {
                signature,
                description,
                ..
            } => format!("`{}`\n\n{}", signature, description),
        }
    }
}

/// Hover content for the word at byte `offset`, if it names something
/// known.
pub fn hover(
    text: &str,
    offset: usize,
    schema: Option<&Catalog>,
    dialect: SqlDialect,
) -> Option<Hover> {
    let document = Document::new(text);
    let tokens = document.tokens();
    let index = word_index(&tokens, offset)?;
    let word = tokens[index];
    let resolver = ScopeResolver::new(&document, &tokens, schema);
    let bindings = resolver.bindings_at(word.start);

    let content = if is_dot(&tokens, index + 1) {
        qualifier_content(&resolver, &bindings, &word, schema)
    } else if let Some(qualifier) = qualifier_before(&tokens, index) {
        qualified_content(&resolver, &bindings, &qualifier, &word, schema)
    } else {
        bare_content(&resolver, &bindings, &word, schema, dialect)
    }?;

    debug!(word = word.name(), "hover resolved");
    Some(Hover {
        content,
        span: Span::locate(text, word.start, word.end - word.start),
    })
}

/// `<word>.`: the word names a table, subquery or alias
fn qualifier_content<'d>(
    resolver: &ScopeResolver<'d>,
    bindings: &Bindings<'d>,
    word: &Token<'_>,
    schema: Option<&Catalog>,
) -> Option<HoverContent> {
    if is_schema_name(schema, word.name()) && bindings.resolve(word.name()).is_none() {
        return None;
    }
    let target = bindings.resolve(word.name()).unwrap_or(word.name());
    match resolver.resolve_source(target, &bindings.visible)? {
        Source::Subquery(sq) => Some(HoverContent::subquery(resolver, sq)),
        Source::Table(table) => Some(HoverContent::table(table)),
    }
}

/// `X.<word>`: a column of X, or table `X.word` when X is a schema
fn qualified_content<'d>(
    resolver: &ScopeResolver<'d>,
    bindings: &Bindings<'d>,
    qualifier: &str,
    word: &Token<'_>,
    schema: Option<&Catalog>,
) -> Option<HoverContent> {
    if let Lookup::Found { column, .. } =
        resolver.lookup_qualified(bindings, qualifier, word.name())
    {
        return Some(HoverContent::column(resolver, column));
    }
    if is_schema_name(schema, qualifier) {
        let table = schema?.get_table(&format!("{}.{}", qualifier, word.name()))?;
        return Some(HoverContent::table(table));
    }
    None
}

/// Bare word: subquery, column in scope, table, then built-in function
fn bare_content<'d>(
    resolver: &ScopeResolver<'d>,
    bindings: &Bindings<'d>,
    word: &Token<'_>,
    schema: Option<&Catalog>,
    dialect: SqlDialect,
) -> Option<HoverContent> {
    let name = word.name();
    if let Some(sq) = bindings.subquery(name) {
        return Some(HoverContent::subquery(resolver, sq));
    }
    if let Lookup::Found { column, .. } = resolver.lookup_unqualified(bindings, name) {
        return Some(HoverContent::column(resolver, column));
    }
    if let Some(table) = schema.and_then(|catalog| catalog.get_table(name)) {
        return Some(HoverContent::table(table));
    }
    dialect
        .catalog()
        .function(name)
        .map(|function| HoverContent::Function {
            name: function.name.to_string(),
            signature: function.signature.to_string(),
            description: function.description.to_string(),
        })
}

/// Name token containing `offset`, or ending right at it
fn word_index(tokens: &[Token<'_>], offset: usize) -> Option<usize> {
    tokens
        .iter()
        .position(|t| t.is_name() && t.start <= offset && offset < t.end)
        .or_else(|| tokens.iter().position(|t| t.is_name() && t.end == offset))
}

fn is_dot(tokens: &[Token<'_>], index: usize) -> bool {
    tokens.get(index).is_some_and(|t| t.kind == TokenKind::Dot)
}

/// Dotted path immediately before `tokens[index]`
fn qualifier_before(tokens: &[Token<'_>], index: usize) -> Option<String> {
    let mut start = index;
    while start >= 2 && tokens[start - 1].kind == TokenKind::Dot && tokens[start - 2].is_name() {
        start -= 2;
    }
    if start == index {
        return None;
    }
    let path = tokens[start..index - 1]
        .iter()
        .filter(|t| t.kind != TokenKind::Dot)
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(".");
    Some(path)
}

fn is_schema_name(schema: Option<&Catalog>, name: &str) -> bool {
    schema.is_some_and(|catalog| catalog.schema_exists(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let mut employees = Table::new("EMPLOYEES")
            .in_schema("HR")
            .with_column(Column::new("EMP_ID").typed("INTEGER").primary_key())
            .with_column(Column::new("NAME").typed("VARCHAR(50)"));
        employees.description = Some("Staff records".into());
        Catalog::from_tables([employees])
    }

    fn hover_at(text: &str, needle: &str) -> Option<HoverContent> {
        let offset = text.rfind(needle).unwrap() + 1;
        hover(text, offset, Some(&catalog()), SqlDialect::Db2).map(|h| h.content)
    }

    #[test]
    fn test_qualified_column() {
        let text = "SELECT e.emp_id FROM hr.employees e";
        let hovered = hover(text, 10, Some(&catalog()), SqlDialect::Db2).unwrap();
        assert_eq!(hovered.span.offset, 9);
        assert_eq!(hovered.span.length, 6);
        match hovered.content {
            HoverContent::Column {
                name,
                data_type,
                primary_key,
                source,
                ..
            } => {
                assert_eq!(name, "EMP_ID");
                assert_eq!(data_type.as_deref(), Some("INTEGER"));
                assert!(primary_key);
                assert_eq!(source, "table EMPLOYEES");
            }
            other => panic!("expected column, got {other:?}"),
        }
    }

    #[test]
    fn test_alias_before_dot_shows_table() {
        let text = "SELECT e.emp_id FROM hr.employees e";
        let content = hover(text, 7, Some(&catalog()), SqlDialect::Db2).unwrap().content;
        assert!(matches!(content, HoverContent::Table { ref name, .. } if name == "EMPLOYEES"));
    }

    #[test]
    fn test_schema_qualified_table() {
        let content = hover_at("SELECT * FROM hr.employees", "employees").unwrap();
        match content {
            HoverContent::Table {
                schema,
                description,
                columns,
                ..
            } => {
                assert_eq!(schema.as_deref(), Some("HR"));
                assert_eq!(description.as_deref(), Some("Staff records"));
                assert_eq!(columns.len(), 2);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_subquery_column_traces_to_schema_type() {
        let text = "WITH a AS (SELECT e.name AS who FROM employees e) SELECT who FROM a";
        match hover_at(text, "who").unwrap() {
            HoverContent::Column {
                name,
                data_type,
                source,
                expression,
                ..
            } => {
                assert_eq!(name, "who");
                assert_eq!(data_type.as_deref(), Some("VARCHAR(50)"));
                assert_eq!(source, "subquery A");
                assert_eq!(expression.as_deref(), Some("e.name"));
            }
            other => panic!("expected column, got {other:?}"),
        }
    }

    #[test]
    fn test_subquery_name_lists_columns() {
        let text = "WITH a AS (SELECT emp_id, name FROM employees) SELECT * FROM a";
        let content = hover_at(text, " a").map(|c| c.to_markdown());
        assert_eq!(content.as_deref(), Some("**A** (subquery)\n\nemp_id, name"));
    }

    #[test]
    fn test_function_and_nothing() {
        let text = "SELECT COALESCE(x, 1) FROM t";
        assert!(matches!(
            hover_at(text, "COALESCE"),
            Some(HoverContent::Function { ref signature, .. }) if signature.starts_with("COALESCE(")
        ));
        assert_eq!(hover("SELECT  1", 7, None, SqlDialect::Db2), None);
    }
}
