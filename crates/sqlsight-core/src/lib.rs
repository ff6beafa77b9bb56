//! sqlsight-core: tolerant SQL analysis for editors
//!
//! Works on partially typed, possibly invalid SQL text without a full
//! grammar: structural diagnostics, schema checks against an optional
//! catalog, completion candidates and hover information. Every entry point
//! is a pure function of its inputs.

pub mod analyzer;
pub mod completion;
pub mod dialect;
pub mod error;
pub mod hover;
pub mod schema;
pub mod scope;
pub mod structure;
pub mod text;

pub use analyzer::{validate, Analyzer};
pub use completion::{
    classify, complete, CompletionContext, CompletionItem, CompletionKind, ContextKind,
    InsertFormat,
};
pub use dialect::SqlDialect;
pub use error::{Diagnostic, DiagnosticKind, SchemaError, Severity, Span};
pub use hover::{hover, Hover, HoverContent};
pub use schema::{Catalog, Column, QualifiedName, Schema, SchemaBuilder, Table};
pub use structure::{parse_subqueries, ParsedSubquery, SubqueryColumn, Wildcard};
pub use text::{offset_to_position, position_to_offset, sanitize};
