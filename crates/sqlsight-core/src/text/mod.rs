//! Text-level primitives shared by every analysis pass
//!
//! All passes work on byte offsets into the original document. The sanitizer
//! keeps the byte length of the text unchanged, so an offset computed on the
//! sanitized text is valid against the original.

pub mod keywords;
mod lexer;
mod sanitize;

use std::ops::Range;

pub use lexer::{tokenize, Token, TokenKind};
pub use sanitize::{mask_comments, sanitize};

/// Convert byte offset to line and column (1-indexed)
pub fn offset_to_position(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Convert a 1-indexed line and column to a byte offset.
///
/// Positions past the end of a line clamp to the line end; positions past the
/// last line clamp to the end of the text.
pub fn position_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut current_line = 1;
    let mut current_col = 1;

    for (i, ch) in source.char_indices() {
        if current_line == line && current_col == column {
            return i;
        }
        if ch == '\n' {
            if current_line == line {
                return i;
            }
            current_line += 1;
            current_col = 1;
        } else {
            current_col += 1;
        }
    }

    source.len()
}

/// Span of the statement containing `offset`, bounded by the nearest `;`
/// before and after it. Expects sanitized text so that semicolons inside
/// strings and comments are already gone.
pub fn statement_bounds(sanitized: &str, offset: usize) -> Range<usize> {
    let offset = floor_char_boundary(sanitized, offset);
    let start = sanitized[..offset].rfind(';').map(|i| i + 1).unwrap_or(0);
    let end = sanitized[offset..]
        .find(';')
        .map(|i| offset + i)
        .unwrap_or(sanitized.len());
    start..end
}

/// `offset` clamped to `text` and moved back onto a character boundary
pub fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '#' || ch == '@'
}

/// Byte range of the word touching `offset`, either containing it or ending
/// right at it.
pub fn word_at(text: &str, offset: usize) -> Option<Range<usize>> {
    let offset = offset.min(text.len());
    if !text.is_char_boundary(offset) {
        return None;
    }
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_word_char(*ch))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(offset);
    let end = text[offset..]
        .char_indices()
        .find(|(_, ch)| !is_word_char(*ch))
        .map(|(i, _)| offset + i)
        .unwrap_or(text.len());
    if start == end {
        None
    } else {
        Some(start..end)
    }
}

/// Parenthesis depth and string state threaded through a forward scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub depth: usize,
    pub in_string: bool,
}

/// What a single [`ScanState::step`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    Open,
    Close,
    /// A `)` with no open parenthesis; depth stays at zero.
    Underflow,
    Other,
}

impl ScanState {
    pub fn step(self, ch: char) -> (Self, ScanEvent) {
        match (self.in_string, ch) {
            (true, '\'') => (
                Self {
                    in_string: false,
                    ..self
                },
                ScanEvent::Other,
            ),
            (true, _) => (self, ScanEvent::Other),
            (false, '\'') => (
                Self {
                    in_string: true,
                    ..self
                },
                ScanEvent::Other,
            ),
            (false, '(') => (
                Self {
                    depth: self.depth + 1,
                    ..self
                },
                ScanEvent::Open,
            ),
            (false, ')') if self.depth == 0 => (self, ScanEvent::Underflow),
            (false, ')') => (
                Self {
                    depth: self.depth - 1,
                    ..self
                },
                ScanEvent::Close,
            ),
            _ => (self, ScanEvent::Other),
        }
    }
}

/// Offset of the `)` matching the `(` at `open`, or `None` when the text ends
/// first.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut state = ScanState::default();
    for (i, ch) in text[open..].char_indices() {
        let (next, event) = state.step(ch);
        state = next;
        if event == ScanEvent::Close && state.depth == 0 {
            return Some(open + i);
        }
    }
    None
}
