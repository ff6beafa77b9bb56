//! SQL analyzer module
//!
//! Structural checks always run; semantic checks run only when a schema
//! catalog is supplied. Findings are returned check by check in a fixed
//! order, never sorted.

mod semantic;
mod structural;

use tracing::debug;

use crate::dialect::SqlDialect;
use crate::error::Diagnostic;
use crate::schema::Catalog;
use crate::scope::{Document, ScopeResolver};

use semantic::SemanticChecker;

/// SQL Analyzer - validates SQL text, optionally against a schema catalog
#[derive(Default)]
pub struct Analyzer<'a> {
    catalog: Option<&'a Catalog>,
    dialect: SqlDialect,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Analyzer<'a> {
    /// Analyzer running only the structural checks
    pub fn new() -> Self {
        Self {
            catalog: None,
            dialect: SqlDialect::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_catalog(catalog: &'a Catalog) -> Self {
        Self {
            catalog: Some(catalog),
            dialect: SqlDialect::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Dialect whose type names are excluded from column checks
    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Analyze SQL text and return diagnostics
    pub fn analyze(&mut self, sql: &str) -> Vec<Diagnostic> {
        self.diagnostics.clear();

        let document = Document::new(sql);
        let tokens = document.tokens();

        self.diagnostics.extend(structural::unclosed_strings(sql));
        self.diagnostics
            .extend(structural::unbalanced_parens(sql, &document.clean));
        self.diagnostics
            .extend(structural::unexpected_commas(sql, &tokens));
        self.diagnostics
            .extend(structural::duplicate_commas(sql, &tokens));
        self.diagnostics.extend(structural::empty_selects(sql, &tokens));
        self.diagnostics.extend(structural::missing_commas(sql, &tokens));
        self.diagnostics
            .extend(structural::incomplete_references(sql, &tokens));

        if let Some(catalog) = self.catalog {
            let resolver = ScopeResolver::new(&document, &tokens, Some(catalog));
            let mut checker = SemanticChecker::new(sql, catalog, &resolver, &tokens, self.dialect);
            self.diagnostics.extend(checker.unknown_tables());
            self.diagnostics.extend(checker.unknown_qualified_columns());
            self.diagnostics.extend(checker.unknown_unqualified_columns());
        }

        debug!(
            subqueries = document.subqueries.len(),
            diagnostics = self.diagnostics.len(),
            "analysis finished"
        );
        std::mem::take(&mut self.diagnostics)
    }
}

/// Validate `text`, running the schema checks only when `schema` is given
pub fn validate(text: &str, schema: Option<&Catalog>) -> Vec<Diagnostic> {
    match schema {
        Some(catalog) => Analyzer::with_catalog(catalog).analyze(text),
        None => Analyzer::new().analyze(text),
    }
}
