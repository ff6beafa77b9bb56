//! Cursor context classification

use indexmap::IndexMap;
use serde::Serialize;

use crate::scope::{Document, ScopeResolver};
use crate::text::keywords::TABLE_KEYWORDS;
use crate::text::{floor_char_boundary, is_word_char, statement_bounds, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Table,
    Column,
    /// Continuation of `schema.` in a table position
    Schema,
    General,
}

/// What the cursor position expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionContext {
    pub kind: ContextKind,
    /// Text before the dot in `alias.` positions
    pub table_alias: Option<String>,
    pub referenced_tables: Vec<String>,
    /// Upper-cased alias or table name to the table it stands for
    pub alias_to_table: IndexMap<String, String>,
}

const COLUMN_KEYWORDS: &[&str] = &["SELECT", "WHERE", "AND", "OR", "ON", "SET", "HAVING"];

/// Classify the position at byte `offset` of `text`.
pub fn classify(text: &str, offset: usize) -> CompletionContext {
    let document = Document::new(text);
    let tokens = document.tokens();
    classify_document(&document, &tokens, offset)
}

pub(crate) fn classify_document(
    document: &Document<'_>,
    tokens: &[Token<'_>],
    offset: usize,
) -> CompletionContext {
    let clean = document.clean.as_str();
    let offset = floor_char_boundary(clean, offset);
    let word_start = clean[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_word_char(*ch))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(offset);
    let statement = statement_bounds(clean, offset);
    let before: Vec<Token<'_>> = tokens
        .iter()
        .filter(|t| t.start >= statement.start && t.end <= word_start)
        .copied()
        .collect();

    let resolver = ScopeResolver::new(document, tokens, None);
    let bindings = resolver.bindings_at(offset);
    let mut referenced_tables: Vec<String> = Vec::new();
    for table in &bindings.tables {
        if !referenced_tables.contains(&table.name) {
            referenced_tables.push(table.name.clone());
        }
    }
    let context = |kind, table_alias| CompletionContext {
        kind,
        table_alias,
        referenced_tables: referenced_tables.clone(),
        alias_to_table: bindings.aliases.clone(),
    };

    let Some(last) = before.last().copied() else {
        return context(ContextKind::General, None);
    };

    // <identifier>.
    if last.kind == TokenKind::Dot && last.end == word_start {
        if let Some((qualifier, path_start)) = qualifier_before(&before) {
            let after_table_keyword = path_start
                .checked_sub(1)
                .is_some_and(|p| before[p].is_any_keyword(TABLE_KEYWORDS));
            let kind = if after_table_keyword {
                ContextKind::Schema
            } else {
                ContextKind::Column
            };
            return context(kind, Some(qualifier));
        }
    }

    if last.is_any_keyword(TABLE_KEYWORDS) {
        return context(ContextKind::Table, None);
    }

    let by_clause = last.is_keyword("BY")
        && before
            .len()
            .checked_sub(2)
            .is_some_and(|p| before[p].is_any_keyword(&["ORDER", "GROUP"]));
    if last.is_any_keyword(COLUMN_KEYWORDS) || by_clause || last.kind == TokenKind::Comma {
        return context(ContextKind::Column, None);
    }

    // Between SELECT and a FROM not typed yet
    let last_select = before.iter().rposition(|t| t.is_keyword("SELECT"));
    let last_from = before.iter().rposition(|t| t.is_keyword("FROM"));
    if let Some(select) = last_select {
        if last_from.map_or(true, |from| from < select) {
            return context(ContextKind::Column, None);
        }
    }

    // After FROM, before WHERE/GROUP/ORDER, not directly after FROM/JOIN
    if let Some(from) = last_from {
        let clause_after = before[from..]
            .iter()
            .any(|t| t.is_any_keyword(&["WHERE", "GROUP", "ORDER"]));
        if !clause_after && !last.is_any_keyword(&["FROM", "JOIN"]) {
            return context(ContextKind::Column, None);
        }
    }

    context(ContextKind::General, None)
}

/// Dotted path ending at the trailing dot of `before`, with the index of
/// its first token
fn qualifier_before(before: &[Token<'_>]) -> Option<(String, usize)> {
    let dot = before.len().checked_sub(1)?;
    let mut start = dot.checked_sub(1)?;
    if !before[start].is_name() || before[start].end != before[dot].start {
        return None;
    }
    while start >= 2
        && before[start - 1].kind == TokenKind::Dot
        && before[start - 2].is_name()
    {
        start -= 2;
    }
    let path = before[start..dot]
        .iter()
        .filter(|t| t.kind != TokenKind::Dot)
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(".");
    Some((path, start))
}

/// Whether `offset` sits inside a line comment or an unterminated block
/// comment. Block comments nest.
pub fn in_comment(text: &str, offset: usize) -> bool {
    let end = floor_char_boundary(text, offset);
    let mut chars = text[..end].chars().peekable();
    let mut line = false;
    let mut block_depth = 0usize;
    let mut in_string = false;

    while let Some(ch) = chars.next() {
        if line {
            line = ch != '\n';
        } else if block_depth > 0 {
            match (ch, chars.peek()) {
                ('/', Some('*')) => {
                    chars.next();
                    block_depth += 1;
                }
                ('*', Some('/')) => {
                    chars.next();
                    block_depth -= 1;
                }
                _ => {}
            }
        } else if in_string {
            in_string = ch != '\'';
        } else {
            match (ch, chars.peek()) {
                ('-', Some('-')) => {
                    chars.next();
                    line = true;
                }
                ('/', Some('*')) => {
                    chars.next();
                    block_depth = 1;
                }
                ('\'', _) => in_string = true,
                _ => {}
            }
        }
    }

    line || block_depth > 0
}
