//! Schema-independent checks
//!
//! Each check is its own linear pass and reports in source order.

use crate::error::{Diagnostic, DiagnosticKind, Span};
use crate::structure::PROJECTION_END;
use crate::text::{mask_comments, ScanEvent, ScanState, Token, TokenKind};

/// Clause keywords that may not follow a comma
const AFTER_COMMA: &[&str] = &[
    "FROM", "WHERE", "HAVING", "UNION", "EXCEPT", "INTERSECT", "FETCH", "LIMIT", "FOR",
];

/// A `'` that is never closed. Runs on the comment-masked text and toggles
/// on every quote not preceded by a backslash, so `''` reads as a close
/// followed by a reopen.
pub(super) fn unclosed_strings(text: &str) -> Vec<Diagnostic> {
    let masked = mask_comments(text);
    let mut open: Option<usize> = None;
    let mut prev = None;

    for (i, ch) in masked.char_indices() {
        if ch == '\'' && prev != Some('\\') {
            open = match open {
                Some(_) => None,
                None => Some(i),
            };
        }
        prev = Some(ch);
    }

    open.map(|offset| {
        Diagnostic::error(
            DiagnosticKind::UnclosedString,
            "unclosed string literal",
            Span::locate(text, offset, 1),
        )
    })
    .into_iter()
    .collect()
}

pub(super) fn unbalanced_parens(text: &str, clean: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut state = ScanState::default();
    let mut open = Vec::new();

    for (i, ch) in clean.char_indices() {
        let (next, event) = state.step(ch);
        state = next;
        match event {
            ScanEvent::Open => open.push(i),
            ScanEvent::Close => {
                open.pop();
            }
            ScanEvent::Underflow => diagnostics.push(Diagnostic::error(
                DiagnosticKind::UnexpectedClosingParenthesis,
                "unexpected closing parenthesis",
                Span::locate(text, i, 1),
            )),
            ScanEvent::Other => {}
        }
    }

    diagnostics.extend(open.into_iter().map(|offset| {
        Diagnostic::error(
            DiagnosticKind::UnclosedParenthesis,
            "unclosed parenthesis",
            Span::locate(text, offset, 1),
        )
    }));
    diagnostics
}

/// Comma directly before a clause keyword, `;` or `)`
pub(super) fn unexpected_commas(text: &str, tokens: &[Token<'_>]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (i, pair) in tokens.windows(2).enumerate() {
        let (comma, next) = (pair[0], pair[1]);
        if comma.kind != TokenKind::Comma {
            continue;
        }
        let clause = match next.kind {
            TokenKind::Semicolon | TokenKind::RParen => Some(next.text.to_string()),
            _ if next.is_any_keyword(AFTER_COMMA) => Some(next.upper()),
            _ if next.is_any_keyword(&["GROUP", "ORDER"])
                && tokens.get(i + 2).is_some_and(|t| t.is_keyword("BY")) =>
            {
                Some(format!("{} BY", next.upper()))
            }
            _ => None,
        };
        if let Some(clause) = clause {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::UnexpectedComma,
                    format!("unexpected comma before {clause}"),
                    Span::locate(text, comma.start, 1),
                )
                .with_help("remove the trailing comma"),
            );
        }
    }

    diagnostics
}

pub(super) fn duplicate_commas(text: &str, tokens: &[Token<'_>]) -> Vec<Diagnostic> {
    tokens
        .windows(2)
        .filter(|pair| pair[0].kind == TokenKind::Comma && pair[1].kind == TokenKind::Comma)
        .map(|pair| {
            Diagnostic::error(
                DiagnosticKind::DuplicateComma,
                "duplicate comma",
                Span::locate(text, pair[1].start, 1),
            )
        })
        .collect()
}

pub(super) fn empty_selects(text: &str, tokens: &[Token<'_>]) -> Vec<Diagnostic> {
    tokens
        .windows(2)
        .filter(|pair| pair[0].is_keyword("SELECT") && pair[1].is_any_keyword(&["FROM", "WHERE"]))
        .map(|pair| {
            let select = pair[0];
            Diagnostic::error(
                DiagnosticKind::EmptySelect,
                "SELECT requires at least one column",
                Span::locate(text, select.start, select.end - select.start),
            )
        })
        .collect()
}

/// Two bare identifiers next to each other at the top level of a
/// projection list. Implicit aliases (`col alias`) are reported as well;
/// the check cannot tell them apart.
pub(super) fn missing_commas(text: &str, tokens: &[Token<'_>]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (select, _) in tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_keyword("SELECT"))
    {
        let mut depth = 0usize;
        let mut k = select + 1;
        while k < tokens.len() {
            let tok = tokens[k];
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen if depth == 0 => break,
                TokenKind::RParen => depth -= 1,
                TokenKind::Semicolon => break,
                _ if depth == 0 && tok.is_any_keyword(PROJECTION_END) => break,
                _ if depth == 0 => {
                    if let Some(next) = tokens.get(k + 1) {
                        if is_bare_pair(tokens, k) {
                            diagnostics.push(Diagnostic::warning(
                                DiagnosticKind::MissingComma,
                                format!("missing comma between {} and {}", tok.text, next.text),
                                Span::locate(text, next.start, next.end - next.start),
                            ));
                        }
                    }
                }
                _ => {}
            }
            k += 1;
        }
    }

    diagnostics
}

fn is_bare_pair(tokens: &[Token<'_>], k: usize) -> bool {
    let (first, second) = (tokens[k], tokens[k + 1]);
    if !(first.is_identifier() && second.is_identifier()) {
        return false;
    }
    let before = k.checked_sub(1).map(|p| tokens[p]);
    let after = tokens.get(k + 2);
    let qualified = before.is_some_and(|t| t.kind == TokenKind::Dot)
        || after.is_some_and(|t| t.kind == TokenKind::Dot);
    let aliased = before.is_some_and(|t| t.is_keyword("AS"));
    !qualified && !aliased
}

/// `name.` followed by whitespace, the end of text, or a clause keyword
pub(super) fn incomplete_references(text: &str, tokens: &[Token<'_>]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (i, tok) in tokens.iter().enumerate() {
        if !tok.is_name() {
            continue;
        }
        let Some(dot) = tokens.get(i + 1) else {
            continue;
        };
        if dot.kind != TokenKind::Dot || dot.start != tok.end {
            continue;
        }
        let dangling = match tokens.get(i + 2) {
            None => true,
            Some(next) if next.start > dot.end => true,
            Some(next) => next.kind == TokenKind::Word
                && crate::text::keywords::is_clause_keyword(next.text),
        };
        if dangling {
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::IncompleteReference,
                format!("incomplete qualified reference '{}.'", tok.text),
                Span::locate(text, tok.start, dot.end - tok.start),
            ));
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{sanitize, tokenize};

    fn run(check: fn(&str, &[Token<'_>]) -> Vec<Diagnostic>, text: &str) -> Vec<String> {
        let clean = sanitize(text);
        let tokens = tokenize(&clean);
        check(text, &tokens).into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn test_unclosed_string_reports_opening_quote() {
        let found = unclosed_strings("SELECT 'abc");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span.offset, 7);
        assert_eq!(found[0].span.column, 8);

        assert!(unclosed_strings("SELECT 'it''s'").is_empty());
        assert!(unclosed_strings("SELECT 'a\\'b'").is_empty());
        assert!(unclosed_strings("SELECT 1 -- don't").is_empty());
    }

    #[test]
    fn test_paren_balance() {
        let text = "SELECT * FROM (T";
        let found = unbalanced_parens(text, &sanitize(text));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DiagnosticKind::UnclosedParenthesis);
        assert_eq!(found[0].span.offset, 14);

        let text = "SELECT * FROM T)";
        let found = unbalanced_parens(text, &sanitize(text));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DiagnosticKind::UnexpectedClosingParenthesis);

        let text = "SELECT ')' FROM (a) ) (";
        let kinds: Vec<_> = unbalanced_parens(text, &sanitize(text))
            .into_iter()
            .map(|d| d.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::UnexpectedClosingParenthesis,
                DiagnosticKind::UnclosedParenthesis
            ]
        );
    }

    #[test]
    fn test_comma_checks() {
        assert_eq!(
            run(unexpected_commas, "SELECT a, FROM t"),
            vec!["unexpected comma before FROM"]
        );
        assert_eq!(
            run(unexpected_commas, "SELECT a FROM t GROUP BY a, ORDER BY a"),
            vec!["unexpected comma before ORDER BY"]
        );
        assert_eq!(
            run(unexpected_commas, "SELECT COUNT(a,) FROM t"),
            vec!["unexpected comma before )"]
        );
        assert!(run(unexpected_commas, "SELECT a, b FROM t").is_empty());
        assert_eq!(run(duplicate_commas, "SELECT a,, b FROM t"), vec!["duplicate comma"]);
        assert_eq!(run(duplicate_commas, "SELECT a, , b FROM t").len(), 1);
    }

    #[test]
    fn test_empty_select() {
        assert_eq!(
            run(empty_selects, "SELECT FROM t"),
            vec!["SELECT requires at least one column"]
        );
        assert_eq!(
            run(empty_selects, "SELECT WHERE x = 1"),
            vec!["SELECT requires at least one column"]
        );
        assert!(run(empty_selects, "SELECT 1 FROM t").is_empty());
    }

    #[test]
    fn test_missing_comma() {
        assert_eq!(
            run(missing_commas, "SELECT emp_id\n       name FROM t"),
            vec!["missing comma between emp_id and name"]
        );
        assert!(run(missing_commas, "SELECT a AS b, c FROM t").is_empty());
        assert!(run(missing_commas, "SELECT e.a, COUNT(x y) FROM t").is_empty());
        assert!(run(missing_commas, "SELECT CASE WHEN a THEN b END FROM t").is_empty());
        assert!(run(missing_commas, "SELECT a FROM t x").is_empty());
    }

    #[test]
    fn test_incomplete_reference() {
        assert_eq!(
            run(incomplete_references, "SELECT e. FROM emp e"),
            vec!["incomplete qualified reference 'e.'"]
        );
        assert_eq!(run(incomplete_references, "SELECT e.").len(), 1);
        assert_eq!(run(incomplete_references, "SELECT e.FROM emp e").len(), 1);
        assert!(run(incomplete_references, "SELECT e.name, e.* FROM emp e").is_empty());
        assert!(run(incomplete_references, "SELECT 1. FROM t").is_empty());
    }
}
