//! Completion candidates
//!
//! Candidates come in three tiers: schema-driven items (subqueries, tables,
//! columns, schemas), then the dialect's static catalogs, then snippet
//! templates. Positions that are unambiguous return their schema-driven
//! items alone.

mod context;

use serde::Serialize;
use tracing::debug;

use crate::dialect::SqlDialect;
use crate::schema::Catalog;
use crate::scope::{Bindings, ColumnRef, Document, ScopeResolver, Source};
use crate::text::floor_char_boundary;

pub use context::{classify, in_comment, CompletionContext, ContextKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionKind {
    Subquery,
    Table,
    Column,
    Schema,
    Keyword,
    ReservedWord,
    SystemService,
    SystemCatalog,
    SystemObject,
    Function,
    DataType,
    Snippet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertFormat {
    Plain,
    /// Template with `${n:placeholder}` tab stops
    Snippet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    pub insert_text: String,
    pub insert_format: InsertFormat,
    pub kind: CompletionKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    /// Lexicographic rank; lower sorts first
    pub sort_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Schema = 0,
    Catalog = 1,
    Snippet = 2,
}

/// Ranked, de-duplicated list under construction
#[derive(Default)]
struct Assembler {
    items: Vec<CompletionItem>,
}

impl Assembler {
    fn push(
        &mut self,
        tier: Tier,
        kind: CompletionKind,
        label: &str,
        detail: impl Into<String>,
        documentation: Option<String>,
    ) {
        self.push_with(tier, kind, label, label, InsertFormat::Plain, detail, documentation);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_with(
        &mut self,
        tier: Tier,
        kind: CompletionKind,
        label: &str,
        insert_text: &str,
        insert_format: InsertFormat,
        detail: impl Into<String>,
        documentation: Option<String>,
    ) {
        if self
            .items
            .iter()
            .any(|item| item.kind == kind && item.label.eq_ignore_ascii_case(label))
        {
            return;
        }
        let sort_text = format!("{}{:05}", tier as u8, self.items.len());
        self.items.push(CompletionItem {
            label: label.to_string(),
            insert_text: insert_text.to_string(),
            insert_format,
            kind,
            detail: detail.into(),
            documentation,
            sort_text,
        });
    }

    fn column(&mut self, column: ColumnRef<'_>) {
        match column {
            ColumnRef::Table { table, column } => self.push(
                Tier::Schema,
                CompletionKind::Column,
                &column.name,
                match column.data_type {
                    Some(_) => format!("{} ({})", column.summary(), table.name),
                    None => table.name.clone(),
                },
                column.description.clone(),
            ),
            ColumnRef::Subquery { subquery, column } => self.push(
                Tier::Schema,
                CompletionKind::Column,
                &column.name,
                format!("subquery {}", subquery.name),
                column.expression.clone(),
            ),
        }
    }

    fn source_columns<'d>(&mut self, resolver: &ScopeResolver<'d>, source: Source<'d>) {
        let (columns, _) = resolver.source_columns(source);
        for column in columns {
            self.column(column);
        }
    }

    fn subqueries(&mut self, bindings: &Bindings<'_>) {
        for sq in &bindings.visible {
            let columns = sq
                .columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.push(
                Tier::Schema,
                CompletionKind::Subquery,
                &sq.name,
                "subquery",
                (!columns.is_empty()).then_some(columns),
            );
        }
    }

    fn tables(&mut self, catalog: &Catalog) {
        for table in catalog.tables() {
            self.push(
                Tier::Schema,
                CompletionKind::Table,
                &catalog.display_name(table),
                table.kind_label(),
                table.description.clone(),
            );
        }
        for schema in catalog.schema_names() {
            self.push(Tier::Schema, CompletionKind::Schema, schema, "schema", None);
        }
    }

    fn dialect(&mut self, dialect: SqlDialect) {
        let catalog = dialect.catalog();
        for keyword in catalog.keywords {
            self.push(Tier::Catalog, CompletionKind::Keyword, keyword, "keyword", None);
        }
        for (word, since) in catalog.reserved_words {
            self.push(
                Tier::Catalog,
                CompletionKind::ReservedWord,
                word,
                format!("reserved since {since}"),
                None,
            );
        }
        for service in catalog.system_services {
            self.push(Tier::Catalog, CompletionKind::SystemService, service, "system service", None);
        }
        for name in catalog.system_catalogs {
            self.push(Tier::Catalog, CompletionKind::SystemCatalog, name, "system catalog", None);
        }
        for name in catalog.system_objects {
            self.push(Tier::Catalog, CompletionKind::SystemObject, name, "system object", None);
        }
        for function in catalog.all_functions() {
            self.push_with(
                Tier::Catalog,
                CompletionKind::Function,
                function.name,
                &format!("{}(${{1}})", function.name),
                InsertFormat::Snippet,
                function.signature,
                Some(function.description.to_string()),
            );
        }
        for data_type in catalog.data_types {
            self.push(Tier::Catalog, CompletionKind::DataType, data_type, "data type", None);
        }
        for snippet in catalog.all_snippets() {
            self.push_with(
                Tier::Snippet,
                CompletionKind::Snippet,
                snippet.label,
                snippet.template,
                InsertFormat::Snippet,
                snippet.description,
                Some(snippet.template.to_string()),
            );
        }
    }
}

/// Completion candidates for the cursor at byte `offset`, best first.
pub fn complete(
    text: &str,
    offset: usize,
    schema: Option<&Catalog>,
    dialect: SqlDialect,
) -> Vec<CompletionItem> {
    let offset = floor_char_boundary(text, offset);
    if in_comment(text, offset) {
        return Vec::new();
    }

    let document = Document::new(text);
    let tokens = document.tokens();
    let context = context::classify_document(&document, &tokens, offset);
    let resolver = ScopeResolver::new(&document, &tokens, schema);
    let bindings = resolver.bindings_at(offset);
    debug!(kind = ?context.kind, alias = ?context.table_alias, "completion context");

    let mut out = Assembler::default();

    match context.kind {
        ContextKind::Table => {
            out.subqueries(&bindings);
            if let Some(catalog) = schema {
                out.tables(catalog);
            }
            return out.items;
        }
        ContextKind::Schema => {
            let qualifier = context.table_alias.as_deref().unwrap_or_default();
            if let Some(found) = schema.and_then(|c| c.get_schema(qualifier)) {
                for table in found.tables.values() {
                    out.push(
                        Tier::Schema,
                        CompletionKind::Table,
                        &table.name,
                        table.kind_label(),
                        table.description.clone(),
                    );
                }
            }
            return out.items;
        }
        ContextKind::Column => {
            if let Some(qualifier) = context.table_alias.as_deref() {
                let target = bindings.resolve(qualifier).unwrap_or(qualifier);
                if let Some(source) = resolver.resolve_source(target, &bindings.visible) {
                    out.source_columns(&resolver, source);
                    return out.items;
                }
                if let Some(found) = schema.and_then(|c| c.get_schema(qualifier)) {
                    for table in found.tables.values() {
                        out.push(
                            Tier::Schema,
                            CompletionKind::Table,
                            &table.name,
                            table.kind_label(),
                            table.description.clone(),
                        );
                    }
                    return out.items;
                }
            } else {
                let sources: Vec<Source<'_>> = bindings
                    .tables
                    .iter()
                    .filter_map(|t| resolver.resolve_source(&t.name, &bindings.visible))
                    .collect();
                for source in &sources {
                    out.source_columns(&resolver, *source);
                }
                if sources.len() == 1 && sources.len() == bindings.tables.len() {
                    return out.items;
                }
            }
        }
        ContextKind::General => {
            out.subqueries(&bindings);
            if let Some(catalog) = schema {
                out.tables(catalog);
            }
        }
    }

    out.dialect(dialect);
    out.items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::from_tables([
            Table::new("EMPLOYEES")
                .in_schema("HR")
                .with_column(Column::new("EMP_ID").typed("INTEGER").primary_key())
                .with_column(Column::new("NAME")),
            Table::new("DEPTS").in_schema("HR").with_column(Column::new("DEPT_ID")),
        ])
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn test_table_context_returns_tables_only() {
        let catalog = catalog();
        let text = "WITH a AS (SELECT 1 AS x) SELECT * FROM ";
        let items = complete(text, text.len(), Some(&catalog), SqlDialect::PostgreSQL);
        assert_eq!(labels(&items), vec!["A", "EMPLOYEES", "DEPTS", "HR"]);
        assert_eq!(items[0].kind, CompletionKind::Subquery);
        assert!(items.windows(2).all(|w| w[0].sort_text < w[1].sort_text));
    }

    #[test]
    fn test_single_source_columns_return_early() {
        let catalog = catalog();
        let text = "SELECT e. FROM hr.employees e";
        let items = complete(text, 9, Some(&catalog), SqlDialect::PostgreSQL);
        assert_eq!(labels(&items), vec!["EMP_ID", "NAME"]);
        assert_eq!(items[0].detail, "INTEGER NOT NULL PK (EMPLOYEES)");

        let text = "SELECT  FROM employees";
        let items = complete(text, 7, Some(&catalog), SqlDialect::PostgreSQL);
        assert_eq!(labels(&items), vec!["EMP_ID", "NAME"]);
    }

    #[test]
    fn test_schema_context_lists_schema_tables() {
        let catalog = catalog();
        let text = "SELECT * FROM hr.";
        let items = complete(text, text.len(), Some(&catalog), SqlDialect::PostgreSQL);
        assert_eq!(labels(&items), vec!["EMPLOYEES", "DEPTS"]);
    }

    #[test]
    fn test_general_context_ranks_schema_then_catalog_then_snippets() {
        let catalog = catalog();
        let items = complete("", 0, Some(&catalog), SqlDialect::Db2);
        let first_keyword = items
            .iter()
            .position(|i| i.kind == CompletionKind::Keyword)
            .unwrap();
        let first_snippet = items
            .iter()
            .position(|i| i.kind == CompletionKind::Snippet)
            .unwrap();
        assert_eq!(items[0].kind, CompletionKind::Table);
        assert!(first_keyword < first_snippet);
        assert!(items[first_snippet].sort_text.starts_with('2'));
        let function = items
            .iter()
            .find(|i| i.kind == CompletionKind::Function && i.label == "DIGITS")
            .unwrap();
        assert_eq!(function.insert_text, "DIGITS(${1})");
        assert_eq!(function.insert_format, InsertFormat::Snippet);
    }

    #[test]
    fn test_comments_suppress_suggestions() {
        let catalog = catalog();
        let text = "SELECT * FROM employees -- comment ";
        assert!(complete(text, text.len(), Some(&catalog), SqlDialect::PostgreSQL).is_empty());
        let text = "SELECT /* open ";
        assert!(complete(text, text.len(), Some(&catalog), SqlDialect::PostgreSQL).is_empty());
    }

    #[test]
    fn test_subquery_columns_complete_through_alias() {
        let text = "WITH a AS (SELECT emp_id, name AS who FROM employees) SELECT x. FROM a x";
        let offset = text.find("x.").unwrap() + 2;
        let items = complete(text, offset, Some(&catalog()), SqlDialect::PostgreSQL);
        assert_eq!(labels(&items), vec!["emp_id", "who"]);
        assert_eq!(items[1].documentation.as_deref(), Some("name"));
    }

    #[test]
    fn test_offset_inside_multibyte_identifier() {
        let text = "SELECT é FROM employees";
        let inside = text.find('é').unwrap() + 1;
        let items = complete(text, inside, Some(&catalog()), SqlDialect::PostgreSQL);
        assert!(items.iter().any(|i| i.label == "EMP_ID"));
    }
}
