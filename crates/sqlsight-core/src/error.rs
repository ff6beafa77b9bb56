//! Error and diagnostic types

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

use crate::text::offset_to_position;

/// Source location span
///
/// Offsets are byte offsets into the original document. Line and column
/// numbers are 1-indexed and count characters; the end position is the start
/// position advanced by the highlighted length on the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Byte offset from start of source
    pub offset: usize,
    /// Highlighted length in bytes
    pub length: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    /// Create a span from a byte offset and length, resolving line/column
    /// against `source`.
    pub fn locate(source: &str, offset: usize, length: usize) -> Self {
        let (line, column) = offset_to_position(source, offset);
        let end = (offset + length).min(source.len());
        let highlighted = source
            .get(offset.min(source.len())..end)
            .map(|s| s.chars().count())
            .unwrap_or(length);
        Self {
            offset,
            length,
            line,
            column,
            end_line: line,
            end_column: column + highlighted,
        }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.offset.into(), span.length)
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// Diagnostic message for SQL analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Get the error code string (e.g., "E0001")
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Types of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// E0001: Table not found in schema
    UnknownTable,
    /// E0002: Column not found in the resolved table or subquery
    UnknownColumn,
    /// E1001: String literal never closed
    UnclosedString,
    /// E1002: Opening parenthesis never closed
    UnclosedParenthesis,
    /// E1003: Closing parenthesis without an opener
    UnexpectedClosingParenthesis,
    /// E1004: Comma directly before a clause keyword
    UnexpectedComma,
    /// E1005: Two commas in a row
    DuplicateComma,
    /// E1006: SELECT without projection
    EmptySelect,
    /// E1007: Two identifiers with no comma between them
    MissingComma,
    /// E1008: `name.` with nothing after the dot
    IncompleteReference,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::UnknownTable => "E0001",
            DiagnosticKind::UnknownColumn => "E0002",
            DiagnosticKind::UnclosedString => "E1001",
            DiagnosticKind::UnclosedParenthesis => "E1002",
            DiagnosticKind::UnexpectedClosingParenthesis => "E1003",
            DiagnosticKind::UnexpectedComma => "E1004",
            DiagnosticKind::DuplicateComma => "E1005",
            DiagnosticKind::EmptySelect => "E1006",
            DiagnosticKind::MissingComma => "E1007",
            DiagnosticKind::IncompleteReference => "E1008",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::UnknownTable => "unknown-table",
            DiagnosticKind::UnknownColumn => "unknown-column",
            DiagnosticKind::UnclosedString => "unclosed-string",
            DiagnosticKind::UnclosedParenthesis => "unclosed-parenthesis",
            DiagnosticKind::UnexpectedClosingParenthesis => "unexpected-closing-parenthesis",
            DiagnosticKind::UnexpectedComma => "unexpected-comma",
            DiagnosticKind::DuplicateComma => "duplicate-comma",
            DiagnosticKind::EmptySelect => "empty-select",
            DiagnosticKind::MissingComma => "missing-comma",
            DiagnosticKind::IncompleteReference => "incomplete-reference",
        }
    }

    /// Whether this finding depends on a schema description
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::UnknownTable | DiagnosticKind::UnknownColumn
        )
    }
}

/// Errors raised while loading a schema description
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid JSON schema description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML schema description: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("schema DDL could not be parsed: {0}")]
    Ddl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_locate_on_second_line() {
        let source = "SELECT 1\nFROM users";
        let span = Span::locate(source, 14, 5);
        assert_eq!(span.line, 2);
        assert_eq!(span.column, 6);
        assert_eq!(span.end_line, 2);
        assert_eq!(span.end_column, 11);
    }

    #[test]
    fn test_severity_names() {
        let names: Vec<_> = [Severity::Error, Severity::Warning, Severity::Info, Severity::Hint]
            .iter()
            .map(|s| serde_json::to_string(s).unwrap())
            .collect();
        assert_eq!(names, vec!["\"error\"", "\"warning\"", "\"info\"", "\"hint\""]);
    }

    #[test]
    fn test_codes_are_distinct() {
        let kinds = [
            DiagnosticKind::UnknownTable,
            DiagnosticKind::UnknownColumn,
            DiagnosticKind::UnclosedString,
            DiagnosticKind::UnclosedParenthesis,
            DiagnosticKind::UnexpectedClosingParenthesis,
            DiagnosticKind::UnexpectedComma,
            DiagnosticKind::DuplicateComma,
            DiagnosticKind::EmptySelect,
            DiagnosticKind::MissingComma,
            DiagnosticKind::IncompleteReference,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }
}
