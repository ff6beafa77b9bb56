//! Scope resolution
//!
//! Maps an offset to the query it belongs to (a subquery body, the main
//! query after every subquery definition, or neither) and answers which
//! tables, aliases and subqueries are visible there. Column ownership is
//! resolved through alias bindings, declared subquery columns, wildcard
//! expansion and finally the schema catalog.

use std::ops::Range;

use indexmap::IndexMap;
use tracing::trace;

use crate::schema::{Catalog, Column, Table};
use crate::structure::{self, ParsedSubquery, SubqueryColumn, TableRef, Wildcard};
use crate::text::{sanitize, statement_bounds, tokenize, Token};

/// Sanitized text plus the subqueries defined in it
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub text: &'a str,
    pub clean: String,
    pub subqueries: Vec<ParsedSubquery>,
}

impl<'a> Document<'a> {
    pub fn new(text: &'a str) -> Self {
        let clean = sanitize(text);
        let subqueries = structure::parse_tokens(text, &clean, &tokenize(&clean));
        Self {
            text,
            clean,
            subqueries,
        }
    }

    pub fn tokens(&self) -> Vec<Token<'_>> {
        tokenize(&self.clean)
    }
}

/// Where an offset sits relative to the subquery definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'d> {
    Subquery(&'d ParsedSubquery),
    /// After the last subquery definition
    MainQuery,
    /// No enclosing subquery structure
    Unstructured,
}

/// A named row source: a subquery or a schema table
#[derive(Debug, Clone, Copy)]
pub enum Source<'d> {
    Subquery(&'d ParsedSubquery),
    Table(&'d Table),
}

impl Source<'_> {
    pub fn name(&self) -> &str {
        match self {
            Source::Subquery(sq) => &sq.name,
            Source::Table(table) => &table.name,
        }
    }

    /// `table NAME` or `subquery NAME`
    pub fn describe(&self) -> String {
        match self {
            Source::Subquery(sq) => format!("subquery {}", sq.name),
            Source::Table(table) => format!("table {}", table.name),
        }
    }
}

/// A column and the definition it comes from
#[derive(Debug, Clone, Copy)]
pub enum ColumnRef<'d> {
    Table {
        table: &'d Table,
        column: &'d Column,
    },
    Subquery {
        subquery: &'d ParsedSubquery,
        column: &'d SubqueryColumn,
    },
}

impl ColumnRef<'_> {
    pub fn name(&self) -> &str {
        match self {
            ColumnRef::Table { column, .. } => &column.name,
            ColumnRef::Subquery { column, .. } => &column.name,
        }
    }
}

/// Result of resolving a column reference
#[derive(Debug, Clone)]
pub enum Lookup<'d> {
    Found {
        source: Source<'d>,
        column: ColumnRef<'d>,
    },
    Missing {
        sources: Vec<Source<'d>>,
        available: Vec<String>,
    },
    /// Not enough information to decide
    Indeterminate,
}

/// Columns produced by expanding the wildcards of a subquery
#[derive(Debug, Clone, Default)]
pub struct Expansion<'d> {
    pub columns: Vec<ColumnRef<'d>>,
    /// False when some wildcard source could not be resolved
    pub complete: bool,
}

/// Tables, aliases and subqueries visible at an offset
#[derive(Debug, Clone)]
pub struct Bindings<'d> {
    pub scope: Scope<'d>,
    pub span: Range<usize>,
    /// FROM/JOIN references in the scope, in source order
    pub tables: Vec<TableRef>,
    /// Upper-cased alias or table name to the table path as written
    pub aliases: IndexMap<String, String>,
    pub visible: Vec<&'d ParsedSubquery>,
}

impl<'d> Bindings<'d> {
    fn new(
        scope: Scope<'d>,
        span: Range<usize>,
        tables: Vec<TableRef>,
        visible: Vec<&'d ParsedSubquery>,
    ) -> Self {
        let aliases = alias_map(&tables);
        Self {
            scope,
            span,
            tables,
            aliases,
            visible,
        }
    }

    /// Table path bound to an alias or table name
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.aliases.get(&name.to_uppercase()).map(String::as_str)
    }

    /// First visible subquery with this name
    pub fn subquery(&self, name: &str) -> Option<&'d ParsedSubquery> {
        find_subquery(&self.visible, name)
    }
}

fn alias_map(tables: &[TableRef]) -> IndexMap<String, String> {
    let mut aliases = IndexMap::new();
    for table in tables {
        if let Some(alias) = &table.alias {
            aliases
                .entry(alias.to_uppercase())
                .or_insert_with(|| table.name.clone());
        }
        aliases
            .entry(table.short_name().to_uppercase())
            .or_insert_with(|| table.name.clone());
        aliases
            .entry(table.upper())
            .or_insert_with(|| table.name.clone());
    }
    aliases
}

fn find_subquery<'d>(visible: &[&'d ParsedSubquery], name: &str) -> Option<&'d ParsedSubquery> {
    let name = name.to_uppercase();
    visible.iter().find(|sq| sq.name == name).copied()
}

/// Resolves scopes and column ownership over one document
pub struct ScopeResolver<'d> {
    clean: &'d str,
    tokens: &'d [Token<'d>],
    subqueries: &'d [ParsedSubquery],
    catalog: Option<&'d Catalog>,
}

impl<'d> ScopeResolver<'d> {
    pub fn new(
        document: &'d Document<'_>,
        tokens: &'d [Token<'d>],
        catalog: Option<&'d Catalog>,
    ) -> Self {
        Self {
            clean: &document.clean,
            tokens,
            subqueries: &document.subqueries,
            catalog,
        }
    }

    pub fn catalog(&self) -> Option<&'d Catalog> {
        self.catalog
    }

    pub fn subqueries(&self) -> &'d [ParsedSubquery] {
        self.subqueries
    }

    pub fn scope_at(&self, offset: usize) -> Scope<'d> {
        if let Some(sq) = self.subqueries.iter().find(|sq| sq.contains_body(offset)) {
            return Scope::Subquery(sq);
        }
        match self.subqueries.iter().map(|sq| sq.end_offset).max() {
            Some(end) if offset > end => Scope::MainQuery,
            _ => Scope::Unstructured,
        }
    }

    /// Text span whose FROM/JOIN clauses bind names for `scope`
    pub fn span(&self, scope: Scope<'d>, offset: usize) -> Range<usize> {
        match scope {
            Scope::Subquery(sq) => sq.body_start_offset..sq.body_end_offset,
            Scope::MainQuery => {
                let statement = statement_bounds(self.clean, offset);
                let after = self
                    .subqueries
                    .iter()
                    .map(|sq| sq.end_offset)
                    .max()
                    .unwrap_or(0);
                statement.start.max(after)..statement.end
            }
            Scope::Unstructured => statement_bounds(self.clean, offset),
        }
    }

    /// Subqueries that may be referenced from `scope`
    pub fn visible(&self, scope: Scope<'d>, offset: usize) -> Vec<&'d ParsedSubquery> {
        match scope {
            Scope::Subquery(current) => self
                .subqueries
                .iter()
                .filter(|sq| sq.start_offset <= current.start_offset)
                .collect(),
            Scope::MainQuery => self.subqueries.iter().collect(),
            Scope::Unstructured => self
                .subqueries
                .iter()
                .filter(|sq| sq.end_offset <= offset)
                .collect(),
        }
    }

    pub fn bindings_at(&self, offset: usize) -> Bindings<'d> {
        let scope = self.scope_at(offset);
        let span = self.span(scope, offset);
        let tables = structure::table_references(self.tokens_in(span.clone()));
        let visible = self.visible(scope, offset);
        trace!(?span, tables = tables.len(), "bindings resolved");
        Bindings::new(scope, span, tables, visible)
    }

    /// Bindings of one subquery body, seeing only earlier subqueries
    fn body_bindings(&self, sq: &'d ParsedSubquery) -> Bindings<'d> {
        let span = sq.body_start_offset..sq.body_end_offset;
        let tables = structure::table_references(self.tokens_in(span.clone()));
        Bindings::new(Scope::Subquery(sq), span, tables, self.declared_before(sq))
    }

    fn declared_before(&self, sq: &ParsedSubquery) -> Vec<&'d ParsedSubquery> {
        self.subqueries
            .iter()
            .filter(|other| other.start_offset < sq.start_offset)
            .collect()
    }

    pub fn tokens_in(&self, range: Range<usize>) -> &'d [Token<'d>] {
        let lo = self.tokens.partition_point(|t| t.start < range.start);
        let hi = self.tokens.partition_point(|t| t.start < range.end);
        &self.tokens[lo..hi.max(lo)]
    }

    /// A visible subquery with this name, else a catalog table
    pub fn resolve_source(
        &self,
        name: &str,
        visible: &[&'d ParsedSubquery],
    ) -> Option<Source<'d>> {
        if let Some(sq) = find_subquery(visible, name) {
            return Some(Source::Subquery(sq));
        }
        self.catalog
            .and_then(|catalog| catalog.get_table(name))
            .map(Source::Table)
    }

    /// Expand the `*` and `X.*` items of a subquery
    pub fn expand(&self, sq: &'d ParsedSubquery) -> Expansion<'d> {
        let mut visited = Vec::new();
        self.expand_guarded(sq, &mut visited)
    }

    fn expand_guarded(&self, sq: &'d ParsedSubquery, visited: &mut Vec<&'d str>) -> Expansion<'d> {
        let mut expansion = Expansion {
            columns: Vec::new(),
            complete: true,
        };
        if sq.wildcards.is_empty() {
            return expansion;
        }
        if visited.contains(&sq.name.as_str()) {
            expansion.complete = false;
            return expansion;
        }
        visited.push(&sq.name);

        let body = self.body_bindings(sq);
        for wildcard in &sq.wildcards {
            let targets: Vec<String> = match wildcard {
                Wildcard::All => sq.from_tables.clone(),
                Wildcard::Qualified(qualifier) => {
                    vec![body.resolve(qualifier).unwrap_or(qualifier.as_str()).to_string()]
                }
            };
            for target in targets {
                match self.resolve_source(&target, &body.visible) {
                    Some(source) => {
                        let (columns, complete) = self.source_columns_guarded(source, visited);
                        expansion.columns.extend(columns);
                        expansion.complete &= complete;
                    }
                    None => expansion.complete = false,
                }
            }
        }

        visited.pop();
        expansion
    }

    /// Every column a source exposes, and whether that list is complete
    pub fn source_columns(&self, source: Source<'d>) -> (Vec<ColumnRef<'d>>, bool) {
        let mut visited = Vec::new();
        self.source_columns_guarded(source, &mut visited)
    }

    fn source_columns_guarded(
        &self,
        source: Source<'d>,
        visited: &mut Vec<&'d str>,
    ) -> (Vec<ColumnRef<'d>>, bool) {
        match source {
            Source::Table(table) => (
                table
                    .columns
                    .iter()
                    .map(|column| ColumnRef::Table { table, column })
                    .collect(),
                true,
            ),
            Source::Subquery(subquery) => {
                let mut columns: Vec<ColumnRef<'d>> = subquery
                    .columns
                    .iter()
                    .map(|column| ColumnRef::Subquery { subquery, column })
                    .collect();
                let expansion = self.expand_guarded(subquery, visited);
                columns.extend(expansion.columns);
                (columns, expansion.complete)
            }
        }
    }

    /// Find `column` in one source
    pub fn lookup_in_source(&self, source: Source<'d>, column: &str) -> Lookup<'d> {
        if let Source::Subquery(subquery) = source {
            if let Some(declared) = subquery.get_column(column) {
                return Lookup::Found {
                    source,
                    column: ColumnRef::Subquery {
                        subquery,
                        column: declared,
                    },
                };
            }
        }

        let (columns, complete) = self.source_columns(source);
        if let Some(found) = columns.iter().find(|c| c.name().eq_ignore_ascii_case(column)) {
            return Lookup::Found {
                source,
                column: *found,
            };
        }
        if !complete {
            return Lookup::Indeterminate;
        }
        Lookup::Missing {
            sources: vec![source],
            available: dedup_names(columns.iter().map(|c| c.name())),
        }
    }

    /// Resolve `qualifier.column` as seen from `bindings`
    pub fn lookup_qualified(
        &self,
        bindings: &Bindings<'d>,
        qualifier: &str,
        column: &str,
    ) -> Lookup<'d> {
        let target = bindings.resolve(qualifier).unwrap_or(qualifier);
        match self.resolve_source(target, &bindings.visible) {
            Some(source) => self.lookup_in_source(source, column),
            None => Lookup::Indeterminate,
        }
    }

    /// Resolve an unqualified column against every table in scope
    pub fn lookup_unqualified(&self, bindings: &Bindings<'d>, column: &str) -> Lookup<'d> {
        if bindings.tables.is_empty() {
            return Lookup::Indeterminate;
        }

        let mut sources = Vec::new();
        let mut available = Vec::new();
        for table in &bindings.tables {
            let Some(source) = self.resolve_source(&table.name, &bindings.visible) else {
                return Lookup::Indeterminate;
            };
            match self.lookup_in_source(source, column) {
                found @ Lookup::Found { .. } => return found,
                Lookup::Missing {
                    available: names, ..
                } => {
                    sources.push(source);
                    available.extend(names);
                }
                Lookup::Indeterminate => return Lookup::Indeterminate,
            }
        }

        Lookup::Missing {
            sources,
            available: dedup_names(available.iter().map(String::as_str)),
        }
    }

    /// Follow a subquery column through direct references down to the
    /// schema column it reads, when that chain is traceable.
    pub fn trace_to_table(&self, column: ColumnRef<'d>) -> Option<(&'d Table, &'d Column)> {
        let mut current = column;
        for _ in 0..=self.subqueries.len() {
            let (subquery, sq_column) = match current {
                ColumnRef::Table { table, column } => return Some((table, column)),
                ColumnRef::Subquery { subquery, column } => (subquery, column),
            };
            let source_column = sq_column.source_column.as_deref()?;
            let body = self.body_bindings(subquery);
            let target = match &sq_column.source_table {
                Some(qualifier) => body
                    .resolve(qualifier)
                    .unwrap_or(qualifier.as_str())
                    .to_string(),
                None if body.tables.len() == 1 => body.tables[0].name.clone(),
                None => return None,
            };
            let source = self.resolve_source(&target, &body.visible)?;
            match self.lookup_in_source(source, source_column) {
                Lookup::Found { column, .. } => current = column,
                _ => return None,
            }
        }
        None
    }
}

fn dedup_names<'n>(names: impl Iterator<Item = &'n str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for name in names {
        if !seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            seen.push(name.to_string());
        }
    }
    seen
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
                .with_column(Column::new("NAME").typed("VARCHAR(50)"))
                .with_column(Column::new("DEPT_ID").typed("INTEGER")),
            Table::new("DEPTS")
                .in_schema("HR")
                .with_column(Column::new("DEPT_ID"))
                .with_column(Column::new("TITLE")),
        ])
    }

    fn with_resolver<R>(text: &str, f: impl FnOnce(&ScopeResolver<'_>) -> R) -> R {
        let catalog = catalog();
        let document = Document::new(text);
        let tokens = document.tokens();
        let resolver = ScopeResolver::new(&document, &tokens, Some(&catalog));
        f(&resolver)
    }

    #[test]
    fn test_scope_classification() {
        let text = "WITH a AS (SELECT emp_id FROM employees) SELECT * FROM a";
        with_resolver(text, |resolver| {
            let inside = text.find("emp_id").unwrap();
            assert!(matches!(resolver.scope_at(inside), Scope::Subquery(sq) if sq.name == "A"));
            assert_eq!(resolver.scope_at(text.len()), Scope::MainQuery);
            assert_eq!(resolver.scope_at(2), Scope::Unstructured);
        });
        with_resolver("SELECT 1 FROM t", |resolver| {
            assert_eq!(resolver.scope_at(3), Scope::Unstructured);
        });
    }

    #[test]
    fn test_alias_bindings_self_map_short_names() {
        let text = "SELECT * FROM hr.employees e JOIN hr.depts ON 1 = 1";
        with_resolver(text, |resolver| {
            let bindings = resolver.bindings_at(text.len());
            assert_eq!(bindings.resolve("e"), Some("hr.employees"));
            assert_eq!(bindings.resolve("EMPLOYEES"), Some("hr.employees"));
            assert_eq!(bindings.resolve("depts"), Some("hr.depts"));
            assert_eq!(bindings.resolve("hr.depts"), Some("hr.depts"));
            assert_eq!(bindings.resolve("x"), None);
        });
    }

    #[test]
    fn test_qualified_lookup_through_subquery() {
        let text = "WITH a AS (SELECT emp_id FROM employees) SELECT a.name, a.emp_id FROM a";
        with_resolver(text, |resolver| {
            let bindings = resolver.bindings_at(text.len());
            match resolver.lookup_qualified(&bindings, "A", "NAME") {
                Lookup::Missing { sources, available } => {
                    assert_eq!(sources[0].describe(), "subquery A");
                    assert_eq!(available, vec!["emp_id"]);
                }
                other => panic!("expected missing, got {other:?}"),
            }
            assert!(matches!(
                resolver.lookup_qualified(&bindings, "a", "EMP_ID"),
                Lookup::Found { .. }
            ));
            assert!(matches!(
                resolver.lookup_qualified(&bindings, "zz", "EMP_ID"),
                Lookup::Indeterminate
            ));
        });
    }

    #[test]
    fn test_wildcard_expansion_recurses_and_reports_completeness() {
        let text = "WITH a AS (SELECT * FROM employees), \
                    b AS (SELECT x.*, d.title FROM a x JOIN depts d ON 1 = 1), \
                    c AS (SELECT * FROM nowhere) \
                    SELECT 1";
        with_resolver(text, |resolver| {
            let subqueries = resolver.subqueries();
            let b = resolver.expand(&subqueries[1]);
            assert!(b.complete);
            let names: Vec<_> = b.columns.iter().map(|c| c.name()).collect();
            assert_eq!(names, vec!["EMP_ID", "NAME", "DEPT_ID"]);

            let c = resolver.expand(&subqueries[2]);
            assert!(!c.complete);
            let bindings = resolver.bindings_at(text.len());
            assert!(matches!(
                resolver.lookup_qualified(&bindings, "c", "anything"),
                Lookup::Indeterminate
            ));
            assert!(matches!(
                resolver.lookup_qualified(&bindings, "b", "title"),
                Lookup::Found { .. }
            ));
        });
    }

    #[test]
    fn test_self_referencing_wildcard_terminates() {
        let text = "WITH a AS (SELECT * FROM a) SELECT * FROM a";
        with_resolver(text, |resolver| {
            let expansion = resolver.expand(&resolver.subqueries()[0]);
            assert!(!expansion.complete);
        });
    }

    #[test]
    fn test_unqualified_lookup_unions_sources() {
        let text = "WITH a AS (SELECT emp_id FROM employees) SELECT title FROM a JOIN depts ON 1 = 1";
        with_resolver(text, |resolver| {
            let bindings = resolver.bindings_at(text.len());
            assert!(matches!(
                resolver.lookup_unqualified(&bindings, "title"),
                Lookup::Found { .. }
            ));
            match resolver.lookup_unqualified(&bindings, "salary") {
                Lookup::Missing { sources, available } => {
                    assert_eq!(sources.len(), 2);
                    assert_eq!(available, vec!["emp_id", "DEPT_ID", "TITLE"]);
                }
                other => panic!("expected missing, got {other:?}"),
            }
        });
    }

    #[test]
    fn test_trace_to_table_follows_direct_references() {
        let text = "WITH a AS (SELECT e.name AS who FROM employees e), \
                    b AS (SELECT who FROM a) SELECT 1";
        with_resolver(text, |resolver| {
            let b = &resolver.subqueries()[1];
            let column = ColumnRef::Subquery {
                subquery: b,
                column: &b.columns[0],
            };
            let (table, column) = resolver.trace_to_table(column).unwrap();
            assert_eq!(table.name, "EMPLOYEES");
            assert_eq!(column.data_type.as_deref(), Some("VARCHAR(50)"));
        });
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let text = "WITH a AS (SELECT x FROM t), a AS (SELECT y FROM t) SELECT a.y FROM a";
        with_resolver(text, |resolver| {
            let bindings = resolver.bindings_at(text.len());
            assert_eq!(bindings.subquery("a").unwrap().columns[0].name, "x");
            assert!(matches!(
                resolver.lookup_qualified(&bindings, "a", "y"),
                Lookup::Missing { .. }
            ));
        });
    }
}
