//! Named subquery (CTE) extraction
//!
//! Works on the token stream of sanitized text and never fails. A `WITH`
//! clause that is cut off or has unbalanced parentheses simply yields fewer
//! subqueries.

use serde::Serialize;
use tracing::trace;

use crate::text::keywords::{self, FROM_ARGUMENT_FUNCTIONS};
use crate::text::{matching_paren, sanitize, tokenize, Token, TokenKind};

/// A `name AS (...)` definition found in a `WITH` clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSubquery {
    /// Upper-cased name
    pub name: String,
    pub columns: Vec<SubqueryColumn>,
    /// `*` and `X.*` items of the projection
    pub wildcards: Vec<Wildcard>,
    /// Start of the name
    pub start_offset: usize,
    /// Just past the closing parenthesis
    pub end_offset: usize,
    /// Just past the opening parenthesis
    pub body_start_offset: usize,
    /// Offset of the closing parenthesis
    pub body_end_offset: usize,
    /// Upper-cased table paths referenced by FROM and JOIN inside the body
    pub from_tables: Vec<String>,
}

impl ParsedSubquery {
    pub fn get_column(&self, name: &str) -> Option<&SubqueryColumn> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn contains_body(&self, offset: usize) -> bool {
        self.body_start_offset <= offset && offset <= self.body_end_offset
    }
}

/// One output column of a subquery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubqueryColumn {
    pub name: String,
    /// Source text of an aliased expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Qualifier of a direct `table.column` reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
}

impl SubqueryColumn {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            expression: None,
            source_table: None,
            source_column: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "qualifier", rename_all = "camelCase")]
pub enum Wildcard {
    /// Bare `*`
    All,
    /// `X.*` with the upper-cased qualifier
    Qualified(String),
}

/// A table named after FROM or JOIN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Dotted path as written, quotes removed
    pub name: String,
    pub alias: Option<String>,
    /// Byte range of the path
    pub start: usize,
    pub end: usize,
}

impl TableRef {
    pub fn upper(&self) -> String {
        self.name.to_uppercase()
    }

    /// Last segment of the path
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Extract every named subquery definition from `text`, in source order.
pub fn parse_subqueries(text: &str) -> Vec<ParsedSubquery> {
    let clean = sanitize(text);
    let tokens = tokenize(&clean);
    parse_tokens(text, &clean, &tokens)
}

pub(crate) fn parse_tokens(text: &str, clean: &str, tokens: &[Token<'_>]) -> Vec<ParsedSubquery> {
    if !tokens.iter().any(|t| t.is_keyword("WITH")) {
        return Vec::new();
    }

    let mut subqueries = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        match match_definition(text, clean, tokens, i) {
            Some((subquery, next)) => {
                trace!(name = %subquery.name, columns = subquery.columns.len(), "parsed subquery");
                subqueries.push(subquery);
                i = next;
            }
            None => i += 1,
        }
    }
    subqueries
}

/// Try to read `name [(cols)] AS [NOT] [MATERIALIZED] (body)` starting at
/// token `i`. Returns the subquery and the index of the first token after it.
fn match_definition(
    text: &str,
    clean: &str,
    tokens: &[Token<'_>],
    i: usize,
) -> Option<(ParsedSubquery, usize)> {
    let name = tokens[i];
    if !name.is_identifier() {
        return None;
    }
    let prev = i.checked_sub(1).map(|p| tokens[p])?;
    if !(prev.is_keyword("WITH") || prev.is_keyword("RECURSIVE") || prev.kind == TokenKind::Comma)
    {
        return None;
    }

    let mut j = i + 1;
    let mut declared = None;
    if tokens.get(j)?.kind == TokenKind::LParen {
        let close = closing_token(tokens, j)?;
        declared = Some(
            tokens[j + 1..close]
                .iter()
                .filter(|t| t.is_name())
                .map(|t| t.name().to_string())
                .collect::<Vec<_>>(),
        );
        j = close + 1;
    }

    if !tokens.get(j)?.is_keyword("AS") {
        return None;
    }
    j += 1;
    if tokens.get(j)?.is_keyword("NOT") {
        j += 1;
    }
    if tokens.get(j)?.is_keyword("MATERIALIZED") {
        j += 1;
    }
    let open = tokens.get(j)?;
    if open.kind != TokenKind::LParen {
        return None;
    }

    let close = matching_paren(clean, open.start)?;
    let body: Vec<Token<'_>> = tokens
        .iter()
        .skip(j + 1)
        .take_while(|t| t.start < close)
        .copied()
        .collect();
    let next = j + 1 + body.len() + 1;

    let (inferred, wildcards) = projection_columns(text, &body);
    let (columns, wildcards) = match declared {
        Some(names) => {
            let columns = names
                .iter()
                .enumerate()
                .map(|(idx, col)| match inferred.get(idx) {
                    Some(source) if inferred.len() == names.len() => SubqueryColumn {
                        name: col.clone(),
                        ..source.clone()
                    },
                    _ => SubqueryColumn::named(col),
                })
                .collect();
            (columns, Vec::new())
        }
        None => (inferred, wildcards),
    };

    let subquery = ParsedSubquery {
        name: name.upper(),
        columns,
        wildcards,
        start_offset: name.start,
        end_offset: close + 1,
        body_start_offset: open.end,
        body_end_offset: close,
        from_tables: table_references(&body).iter().map(TableRef::upper).collect(),
    };
    Some((subquery, next))
}

/// Index of the `)` token closing the `(` token at `open`
fn closing_token(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate().skip(open) {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) const PROJECTION_END: &[&str] = &[
    "FROM", "WHERE", "GROUP", "ORDER", "HAVING", "UNION", "EXCEPT", "INTERSECT", "LIMIT", "FETCH",
    "WINDOW", "INTO",
];

/// Token range of the top-level projection list: after the first depth-0
/// `SELECT` up to the clause that ends it.
pub(crate) fn projection_range(tokens: &[Token<'_>]) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut start = None;
    for (idx, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            _ if start.is_none() && tok.is_keyword("SELECT") => start = Some(idx + 1),
            _ if start.is_some() && tok.is_any_keyword(PROJECTION_END) => {
                return start.map(|s| (s, idx));
            }
            _ => {}
        }
    }
    start.map(|s| (s, tokens.len()))
}

/// Split a token slice on commas at parenthesis depth zero
pub(crate) fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                items.push(&tokens[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    items.push(&tokens[start..]);
    items
}

/// Upper-cased names that select lists give their items, with or without
/// `AS`, across every SELECT in `tokens`.
pub(crate) fn select_aliases(text: &str, tokens: &[Token<'_>]) -> Vec<String> {
    let mut names = Vec::new();
    for (idx, tok) in tokens.iter().enumerate() {
        if !tok.is_keyword("SELECT") {
            continue;
        }
        let (columns, _) = projection_columns(text, enclosed(&tokens[idx..]));
        names.extend(
            columns
                .into_iter()
                .filter(|c| c.expression.is_some())
                .map(|c| c.name.to_uppercase()),
        );
    }
    names
}

/// Prefix of `tokens` before the first unmatched `)`
fn enclosed<'t, 'a>(tokens: &'t [Token<'a>]) -> &'t [Token<'a>] {
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen if depth == 0 => return &tokens[..idx],
            TokenKind::RParen => depth -= 1,
            _ => {}
        }
    }
    tokens
}

fn projection_columns(text: &str, body: &[Token<'_>]) -> (Vec<SubqueryColumn>, Vec<Wildcard>) {
    let mut columns = Vec::new();
    let mut wildcards = Vec::new();
    let Some((start, end)) = projection_range(body) else {
        return (columns, wildcards);
    };

    for item in split_top_level(&body[start..end]) {
        let item = match item.first() {
            Some(first) if first.is_any_keyword(&["DISTINCT", "ALL"]) => &item[1..],
            _ => item,
        };
        if let Some(wildcard) = classify_wildcard(item) {
            wildcards.push(wildcard);
        } else if let Some(column) = classify_column(text, item) {
            columns.push(column);
        }
    }

    (columns, wildcards)
}

fn classify_wildcard(item: &[Token<'_>]) -> Option<Wildcard> {
    let (last, path) = item.split_last()?;
    if last.kind != TokenKind::Star {
        return None;
    }
    if path.is_empty() {
        return Some(Wildcard::All);
    }
    let (dot, qualifier) = path.split_last()?;
    if dot.kind != TokenKind::Dot {
        return None;
    }
    dotted_path(qualifier).map(|q| Wildcard::Qualified(q.to_uppercase()))
}

fn classify_column(text: &str, item: &[Token<'_>]) -> Option<SubqueryColumn> {
    let (last, rest) = item.split_last()?;
    if !last.is_name() {
        return None;
    }

    // <expr> AS <alias>
    if let Some((as_kw, expr)) = rest.split_last() {
        if as_kw.is_keyword("AS") && !expr.is_empty() {
            return Some(aliased(text, last, expr));
        }
    }

    // <path>.<column> or a bare identifier
    if rest.is_empty() {
        if !last.is_identifier() {
            return None;
        }
        return Some(SubqueryColumn {
            source_column: Some(last.name().to_string()),
            ..SubqueryColumn::named(last.name())
        });
    }
    if let Some((dot, qualifier)) = rest.split_last() {
        if dot.kind == TokenKind::Dot {
            let qualifier = dotted_path(qualifier)?;
            return Some(SubqueryColumn {
                source_table: Some(qualifier),
                source_column: Some(last.name().to_string()),
                ..SubqueryColumn::named(last.name())
            });
        }
    }

    // <expr> <alias>
    let before = rest.last()?;
    let implicit = last.is_identifier()
        && (before.is_name()
            || matches!(
                before.kind,
                TokenKind::RParen | TokenKind::Number | TokenKind::String
            ));
    implicit.then(|| aliased(text, last, rest))
}

fn aliased(text: &str, alias: &Token<'_>, expr: &[Token<'_>]) -> SubqueryColumn {
    let (first, last) = (expr[0], expr[expr.len() - 1]);
    let mut column = SubqueryColumn::named(alias.name());
    column.expression = Some(text[first.start..last.end].trim().to_string());

    // A renamed plain reference still points at its source column
    match expr {
        [col] if col.is_identifier() => column.source_column = Some(col.name().to_string()),
        [.., dot, col] if dot.kind == TokenKind::Dot && col.is_name() => {
            if let Some(qualifier) = dotted_path(&expr[..expr.len() - 2]) {
                column.source_table = Some(qualifier);
                column.source_column = Some(col.name().to_string());
            }
        }
        _ => {}
    }
    column
}

/// `a.b.c` as a string when the tokens alternate name and dot
fn dotted_path(tokens: &[Token<'_>]) -> Option<String> {
    if tokens.is_empty() || tokens.len() % 2 == 0 {
        return None;
    }
    let mut parts = Vec::new();
    for (idx, tok) in tokens.iter().enumerate() {
        if idx % 2 == 0 {
            if !tok.is_name() {
                return None;
            }
            parts.push(tok.name());
        } else if tok.kind != TokenKind::Dot {
            return None;
        }
    }
    Some(parts.join("."))
}

/// Tables named after FROM or JOIN anywhere in `tokens`, including
/// comma-separated FROM lists. Derived tables, table functions and the
/// `FROM` inside `EXTRACT(... FROM ...)`-style calls are skipped.
pub(crate) fn table_references(tokens: &[Token<'_>]) -> Vec<TableRef> {
    let mut refs = Vec::new();
    // One entry per open parenthesis: whether it opens a FROM-argument call
    let mut parens: Vec<bool> = Vec::new();

    for (idx, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => {
                let call = idx
                    .checked_sub(1)
                    .is_some_and(|p| tokens[p].is_any_keyword(FROM_ARGUMENT_FUNCTIONS));
                parens.push(call);
                continue;
            }
            TokenKind::RParen => {
                parens.pop();
                continue;
            }
            _ => {}
        }

        let is_from = tok.is_keyword("FROM");
        if !(is_from || tok.is_keyword("JOIN")) || parens.last() == Some(&true) {
            continue;
        }

        let mut j = idx + 1;
        loop {
            if tokens.get(j).is_some_and(|t| t.is_keyword("ONLY")) {
                j += 1;
            }
            let Some((table, next)) = read_table_ref(tokens, j) else {
                break;
            };
            refs.push(table);
            j = next;
            if is_from && tokens.get(j).is_some_and(|t| t.kind == TokenKind::Comma) {
                j += 1;
            } else {
                break;
            }
        }
    }

    refs
}

/// `path [[AS] alias]` starting at token `i`
fn read_table_ref(tokens: &[Token<'_>], i: usize) -> Option<(TableRef, usize)> {
    let first = tokens.get(i)?;
    if !first.is_identifier() {
        return None;
    }

    let mut j = i + 1;
    while tokens.get(j).is_some_and(|t| t.kind == TokenKind::Dot)
        && tokens.get(j + 1).is_some_and(|t| t.is_name())
    {
        j += 2;
    }
    // Table function call
    if tokens.get(j).is_some_and(|t| t.kind == TokenKind::LParen) {
        return None;
    }

    let path = &tokens[i..j];
    let mut table = TableRef {
        name: dotted_path(path)?,
        alias: None,
        start: first.start,
        end: path[path.len() - 1].end,
    };

    match tokens.get(j) {
        Some(t) if t.is_keyword("AS") => {
            if let Some(alias) = tokens
                .get(j + 1)
                .filter(|a| a.is_name() && !keywords::is_clause_keyword(a.text))
            {
                table.alias = Some(alias.name().to_string());
                j += 2;
            } else {
                j += 1;
            }
        }
        Some(t) if t.is_identifier() && !keywords::is_clause_keyword(t.text) => {
            table.alias = Some(t.name().to_string());
            j += 1;
        }
        _ => {}
    }

    Some((table, j))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(columns: &[SubqueryColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_single_subquery() {
        let parsed = parse_subqueries("WITH A AS (SELECT X, Y FROM T) SELECT * FROM A");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "A");
        assert_eq!(names(&parsed[0].columns), vec!["X", "Y"]);
        assert_eq!(parsed[0].from_tables, vec!["T"]);
    }

    #[test]
    fn test_offsets_cover_definition_and_body() {
        let text = "WITH recent AS (SELECT id FROM orders) SELECT id FROM recent";
        let parsed = parse_subqueries(text);
        let sq = &parsed[0];
        assert_eq!(sq.name, "RECENT");
        assert_eq!(&text[sq.start_offset..sq.end_offset], "recent AS (SELECT id FROM orders)");
        assert_eq!(
            &text[sq.body_start_offset..sq.body_end_offset],
            "SELECT id FROM orders"
        );
    }

    #[test]
    fn test_column_shapes() {
        let text = "WITH s AS (SELECT DISTINCT e.emp_id, e.name AS full_name, \
                    COUNT(*) AS cnt, salary * 12 yearly, dept, UPPER(x) FROM hr.employees e) \
                    SELECT * FROM s";
        let sq = &parse_subqueries(text)[0];
        assert_eq!(
            names(&sq.columns),
            vec!["emp_id", "full_name", "cnt", "yearly", "dept"]
        );

        assert_eq!(sq.columns[0].source_table.as_deref(), Some("e"));
        assert_eq!(sq.columns[0].source_column.as_deref(), Some("emp_id"));
        assert_eq!(sq.columns[1].expression.as_deref(), Some("e.name"));
        assert_eq!(sq.columns[1].source_column.as_deref(), Some("name"));
        assert_eq!(sq.columns[2].expression.as_deref(), Some("COUNT(*)"));
        assert_eq!(sq.columns[2].source_column, None);
        assert_eq!(sq.columns[3].expression.as_deref(), Some("salary * 12"));
        assert_eq!(sq.from_tables, vec!["HR.EMPLOYEES"]);
    }

    #[test]
    fn test_wildcards_are_recorded() {
        let sq = &parse_subqueries("WITH a AS (SELECT *, t.* FROM t JOIN u ON 1 = 1) SELECT 1")[0];
        assert!(sq.columns.is_empty());
        assert_eq!(
            sq.wildcards,
            vec![Wildcard::All, Wildcard::Qualified("T".to_string())]
        );
        assert_eq!(sq.from_tables, vec!["T", "U"]);
    }

    #[test]
    fn test_explicit_column_list_and_materialized() {
        let text = "WITH totals (dept, total) AS MATERIALIZED (SELECT d, SUM(x) FROM t GROUP BY d), \
                    other AS NOT MATERIALIZED (SELECT 1 AS one) SELECT * FROM totals";
        let parsed = parse_subqueries(text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(names(&parsed[0].columns), vec!["dept", "total"]);
        assert_eq!(parsed[1].name, "OTHER");
        assert_eq!(names(&parsed[1].columns), vec!["one"]);
    }

    #[test]
    fn test_chained_subqueries_and_strings() {
        let text = "WITH a AS (SELECT id FROM t WHERE note = ')'), \
                    b AS (SELECT a.id FROM a) SELECT * FROM b";
        let parsed = parse_subqueries(text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].from_tables, vec!["A"]);
        assert!(parsed[0].end_offset <= parsed[1].start_offset);
    }

    #[test]
    fn test_malformed_with_yields_fewer_entries() {
        assert!(parse_subqueries("SELECT x AS (1) FROM t").is_empty());
        assert!(parse_subqueries("WITH a AS (SELECT 1").is_empty());
        let parsed = parse_subqueries("WITH a AS (SELECT 1 AS x), b AS (SELECT");
        assert_eq!(parsed.len(), 1);
        assert!(parse_subqueries("WITH").is_empty());
        assert!(parse_subqueries("").is_empty());
    }

    #[test]
    fn test_from_inside_extract_is_not_a_table() {
        let sq = &parse_subqueries(
            "WITH a AS (SELECT EXTRACT(YEAR FROM hired) AS y FROM emp, dept d) SELECT 1",
        )[0];
        assert_eq!(sq.from_tables, vec!["EMP", "DEPT"]);
        assert_eq!(names(&sq.columns), vec!["y"]);
    }

    #[test]
    fn test_select_aliases_include_implicit_names() {
        let text = "WITH a AS (SELECT COUNT(*) cnt, id FROM t) \
                    SELECT (SELECT MAX(x) peak FROM u) AS best, a.id ident FROM a";
        let sanitized = sanitize(text);
        let tokens = tokenize(&sanitized);
        assert_eq!(select_aliases(text, &tokens), vec!["CNT", "BEST", "IDENT", "PEAK"]);
    }

    #[test]
    fn test_table_references_with_aliases() {
        let clean = sanitize("SELECT * FROM hr.emp AS e JOIN dept d ON 1=1 LEFT JOIN x WHERE 1=1");
        let tokens = tokenize(&clean);
        let refs = table_references(&tokens);
        let summary: Vec<_> = refs
            .iter()
            .map(|r| (r.name.as_str(), r.alias.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![("hr.emp", Some("e")), ("dept", Some("d")), ("x", None)]
        );
        assert_eq!(refs[0].short_name(), "emp");
    }
}
