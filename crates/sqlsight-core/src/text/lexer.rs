//! Tolerant token scanner
//!
//! Runs over sanitized text and never fails: anything it does not recognise
//! becomes a single-character [`TokenKind::Operator`].

use super::keywords;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    /// `"name"` or `` `name` ``
    QuotedIdent,
    Number,
    /// Single-quoted literal (contents are blank after sanitizing)
    String,
    /// Bind parameter: `?`, `:name`, `@name`, `$1`
    Parameter,
    Comma,
    Dot,
    LParen,
    RParen,
    Semicolon,
    Star,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_any_keyword(&self, candidates: &[&str]) -> bool {
        self.kind == TokenKind::Word
            && candidates
                .iter()
                .any(|kw| self.text.eq_ignore_ascii_case(kw))
    }

    /// A word that is not a reserved keyword, or a quoted identifier.
    pub fn is_identifier(&self) -> bool {
        match self.kind {
            TokenKind::Word => !keywords::is_keyword(self.text),
            TokenKind::QuotedIdent => true,
            _ => false,
        }
    }

    /// Any word or quoted identifier, keyword or not.
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::QuotedIdent)
    }

    /// Identifier text with surrounding quotes removed.
    pub fn name(&self) -> &'a str {
        match self.kind {
            TokenKind::QuotedIdent if self.text.len() >= 2 => {
                let inner = &self.text[1..];
                inner.strip_suffix(['"', '`']).unwrap_or(inner)
            }
            _ => self.text,
        }
    }

    pub fn upper(&self) -> String {
        self.name().to_uppercase()
    }
}

/// Split `text` into tokens, skipping whitespace.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }

        let kind = match ch {
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ';' => TokenKind::Semicolon,
            '*' => TokenKind::Star,
            '?' => TokenKind::Parameter,
            '\'' => {
                consume_until(&mut chars, '\'');
                TokenKind::String
            }
            '"' | '`' => {
                consume_until(&mut chars, ch);
                TokenKind::QuotedIdent
            }
            ':' | '@' | '$' if chars.peek().is_some_and(|(_, c)| super::is_word_char(*c)) => {
                while chars.next_if(|(_, c)| super::is_word_char(*c)).is_some() {}
                TokenKind::Parameter
            }
            ':' if chars.peek().is_some_and(|(_, c)| *c == ':') => {
                chars.next();
                TokenKind::Operator
            }
            c if c.is_ascii_digit() => {
                while chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
                let mut lookahead = chars.clone();
                if lookahead.next().is_some_and(|(_, c)| c == '.')
                    && lookahead.next().is_some_and(|(_, c)| c.is_ascii_digit())
                {
                    chars.next();
                    while chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
                }
                TokenKind::Number
            }
            c if c.is_alphabetic() || c == '_' => {
                while chars.next_if(|(_, c)| super::is_word_char(*c)).is_some() {}
                TokenKind::Word
            }
            _ => TokenKind::Operator,
        };

        let end = chars.peek().map(|(i, _)| *i).unwrap_or(text.len());
        tokens.push(Token {
            kind,
            text: &text[start..end],
            start,
            end,
        });
    }

    tokens
}

fn consume_until(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, close: char) {
    for (_, c) in chars.by_ref() {
        if c == close {
            break;
        }
    }
}
