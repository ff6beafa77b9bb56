//! Schema-dependent checks
//!
//! Every finding here is a warning: the schema description may be partial,
//! so a mismatch is informational.

use std::ops::Range;

use crate::dialect::SqlDialect;
use crate::error::{Diagnostic, DiagnosticKind, Span};
use crate::schema::Catalog;
use crate::scope::{Bindings, Lookup, Scope, ScopeResolver, Source};
use crate::structure::{self, TableRef};
use crate::text::keywords::TABLE_KEYWORDS;
use crate::text::{Token, TokenKind};

pub(super) struct SemanticChecker<'d> {
    text: &'d str,
    catalog: &'d Catalog,
    resolver: &'d ScopeResolver<'d>,
    tokens: &'d [Token<'d>],
    table_refs: Vec<TableRef>,
    /// Type names of the active dialect, never column references
    data_types: &'static [&'static str],
    /// Bindings already computed, keyed by their span
    bindings: Vec<Bindings<'d>>,
}

impl<'d> SemanticChecker<'d> {
    pub(super) fn new(
        text: &'d str,
        catalog: &'d Catalog,
        resolver: &'d ScopeResolver<'d>,
        tokens: &'d [Token<'d>],
        dialect: SqlDialect,
    ) -> Self {
        Self {
            text,
            catalog,
            resolver,
            tokens,
            table_refs: structure::table_references(tokens),
            data_types: dialect.catalog().data_types,
            bindings: Vec::new(),
        }
    }

    /// FROM/JOIN targets that are neither schema tables nor subqueries
    pub(super) fn unknown_tables(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for table in &self.table_refs {
            let upper = table.upper();
            if self.resolver.subqueries().iter().any(|sq| sq.name == upper) {
                continue;
            }
            if self.catalog.table_exists(&table.name) {
                continue;
            }

            let mut diagnostic = Diagnostic::warning(
                DiagnosticKind::UnknownTable,
                format!("unknown table: {}", table.name),
                Span::locate(self.text, table.start, table.end - table.start),
            );
            let candidates = self.catalog.tables().map(|t| t.name.as_str());
            if let Some(similar) = find_similar(table.short_name(), candidates) {
                diagnostic = diagnostic.with_help(format!("did you mean '{}'?", similar));
            }
            diagnostics.push(diagnostic);
        }

        diagnostics
    }

    /// `qualifier.column` references resolved through the scope at each
    /// reference
    pub(super) fn unknown_qualified_columns(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let tokens = self.tokens;
        let mut i = 0;

        while i < tokens.len() {
            let Some(chain) = dotted_chain(tokens, i) else {
                i += 1;
                continue;
            };
            i = chain.end;

            let segments = &tokens[chain.clone()];
            let column = segments[segments.len() - 1];
            let followed_by_call = tokens
                .get(chain.end)
                .is_some_and(|t| t.kind == TokenKind::LParen);
            if followed_by_call || self.is_table_path(segments[0].start) {
                continue;
            }

            let qualifier = segments[..segments.len() - 2]
                .iter()
                .filter(|t| t.kind != TokenKind::Dot)
                .map(|t| t.name())
                .collect::<Vec<_>>()
                .join(".");

            let bindings = self.bindings_at(column.start);
            if let Lookup::Missing { sources, available } =
                self.resolver.lookup_qualified(&bindings, &qualifier, column.name())
            {
                diagnostics.push(unknown_column(self.text, &column, &sources, &available));
            }
        }

        diagnostics
    }

    /// Bare column references in the main query and in subquery bodies that
    /// read from other subqueries
    pub(super) fn unknown_unqualified_columns(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let aliases = self.defined_aliases();
        let tokens = self.tokens;

        for (i, tok) in tokens.iter().enumerate() {
            if !self.is_bare_column(i, &aliases) {
                continue;
            }
            let checked = match self.resolver.scope_at(tok.start) {
                Scope::MainQuery => true,
                Scope::Subquery(sq) => {
                    let earlier = self.resolver.visible(Scope::Subquery(sq), tok.start);
                    sq.from_tables
                        .iter()
                        .any(|t| earlier.iter().any(|e| &e.name == t && e.name != sq.name))
                }
                Scope::Unstructured => false,
            };
            if !checked {
                continue;
            }

            let bindings = self.bindings_at(tok.start);
            if let Lookup::Missing { sources, available } =
                self.resolver.lookup_unqualified(&bindings, tok.name())
            {
                diagnostics.push(unknown_column(self.text, tok, &sources, &available));
            }
        }

        diagnostics
    }

    fn bindings_at(&mut self, offset: usize) -> Bindings<'d> {
        let scope = self.resolver.scope_at(offset);
        let span = self.resolver.span(scope, offset);
        if let Some(cached) = self.bindings.iter().find(|b| b.span == span) {
            return cached.clone();
        }
        let bindings = self.resolver.bindings_at(offset);
        self.bindings.push(bindings.clone());
        bindings
    }

    fn is_table_path(&self, offset: usize) -> bool {
        self.table_refs
            .iter()
            .any(|t| t.start <= offset && offset < t.end)
    }

    /// Names introduced by `AS`, select-list aliases, table aliases and
    /// subquery names; a bare token with one of these names is not a column
    /// reference.
    fn defined_aliases(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tokens
            .windows(2)
            .filter(|pair| pair[0].is_keyword("AS") && pair[1].is_name())
            .map(|pair| pair[1].upper())
            .collect();
        names.extend(structure::select_aliases(self.text, self.tokens));
        names.extend(
            self.table_refs
                .iter()
                .filter_map(|t| t.alias.as_ref())
                .map(|a| a.to_uppercase()),
        );
        names.extend(self.resolver.subqueries().iter().map(|sq| sq.name.clone()));
        names
    }

    fn is_bare_column(&self, i: usize, aliases: &[String]) -> bool {
        let tok = self.tokens[i];
        if !tok.is_identifier() {
            return false;
        }
        let before = i.checked_sub(1).map(|p| self.tokens[p]);
        let after = self.tokens.get(i + 1);

        if after.is_some_and(|t| matches!(t.kind, TokenKind::LParen | TokenKind::Dot)) {
            return false;
        }
        if before.is_some_and(|t| {
            t.kind == TokenKind::Dot
                || t.text == "::"
                || t.is_keyword("AS")
                || t.is_any_keyword(TABLE_KEYWORDS)
        }) {
            return false;
        }
        if tok.kind == TokenKind::Word
            && self
                .data_types
                .iter()
                .any(|ty| ty.eq_ignore_ascii_case(tok.text))
        {
            return false;
        }
        // Alias right after a table path
        if before.is_some_and(|b| self.table_refs.iter().any(|t| t.end == b.end)) {
            return false;
        }
        if self.is_table_path(tok.start) {
            return false;
        }
        !aliases.contains(&tok.upper())
    }
}

/// Token range of `name(.name)+` starting at `i`, when `i` is not itself
/// preceded by a dot.
fn dotted_chain(tokens: &[Token<'_>], i: usize) -> Option<Range<usize>> {
    if !tokens[i].is_name() {
        return None;
    }
    if i > 0 && tokens[i - 1].kind == TokenKind::Dot {
        return None;
    }
    let mut end = i + 1;
    while tokens.get(end).is_some_and(|t| t.kind == TokenKind::Dot)
        && tokens.get(end + 1).is_some_and(|t| t.is_name())
    {
        end += 2;
    }
    (end > i + 1).then_some(i..end)
}

fn unknown_column(
    text: &str,
    column: &Token<'_>,
    sources: &[Source<'_>],
    available: &[String],
) -> Diagnostic {
    let owners = sources
        .iter()
        .map(Source::describe)
        .collect::<Vec<_>>()
        .join(", ");
    let mut diagnostic = Diagnostic::warning(
        DiagnosticKind::UnknownColumn,
        format!(
            "unknown column {} in {} (available: {})",
            column.name(),
            owners,
            available.join(", ")
        ),
        Span::locate(text, column.start, column.end - column.start),
    );
    if let Some(similar) = find_similar(column.name(), available.iter().map(String::as_str)) {
        diagnostic = diagnostic.with_help(format!("did you mean '{}'?", similar));
    }
    diagnostic
}

/// Closest candidate within edit distance 3
fn find_similar<'c>(name: &str, candidates: impl Iterator<Item = &'c str>) -> Option<&'c str> {
    let name_lower = name.to_lowercase();
    let mut best_match: Option<(usize, &str)> = None;

    for candidate in candidates {
        let distance = levenshtein_distance(&name_lower, &candidate.to_lowercase());
        if distance == 0 {
            continue;
        }

        // Only suggest if reasonably similar (distance <= 3)
        if distance <= 3 && best_match.map_or(true, |(best, _)| distance < best) {
            best_match = Some((distance, candidate));
        }
    }

    best_match.map(|(_, name)| name)
}

/// Simple Levenshtein distance implementation
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut current = vec![0; n + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != b_ch);
            current[j + 1] = (prev[j + 1] + 1).min(current[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[n]
}
