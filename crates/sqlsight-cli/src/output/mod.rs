//! Output formatting

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use sqlsight_core::{CompletionItem, Diagnostic, Hover, Severity};

use crate::args::OutputFormat;

/// Output formatter for diagnostics
pub struct OutputFormatter {
    format: OutputFormat,
    file_name: String,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, file_name: String) -> Self {
        Self { format, file_name }
    }

    /// Print diagnostics in the configured format
    pub fn print_diagnostics(&self, diagnostics: &[Diagnostic], source: &str) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                self.print_human(diagnostics, source);
                Ok(())
            }
            OutputFormat::Json => self.print_json(diagnostics),
            OutputFormat::Sarif => self.print_sarif(diagnostics),
        }
    }

    fn print_human(&self, diagnostics: &[Diagnostic], source: &str) {
        for diag in diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "\x1b[31merror\x1b[0m",
                Severity::Warning => "\x1b[33mwarning\x1b[0m",
                Severity::Info => "\x1b[34minfo\x1b[0m",
                Severity::Hint => "\x1b[36mhint\x1b[0m",
            };

            eprintln!("{}[{}]: {}", severity_str, diag.code(), diag.message);

            let span = diag.span;
            eprintln!("  --> {}:{}:{}", self.file_name, span.line, span.column);

            if let Some(source_line) = get_source_line(source, span.line) {
                eprintln!("   |");
                eprintln!("{:>3} | {}", span.line, source_line);

                let width = source_line.chars().count();
                let padding = " ".repeat(span.column.saturating_sub(1));
                let underline = "^".repeat(
                    (span.end_column - span.column)
                        .min((width + 1).saturating_sub(span.column))
                        .max(1),
                );
                eprintln!("   | {}{}", padding, underline);
            }

            if let Some(help) = &diag.help {
                eprintln!("   = help: {}", help);
            }

            eprintln!();
        }
    }

    fn print_json(&self, diagnostics: &[Diagnostic]) -> Result<()> {
        let output = serde_json::json!({
            "file": self.file_name,
            "diagnostics": diagnostics
        });
        print_pretty(&output)
    }

    fn print_sarif(&self, diagnostics: &[Diagnostic]) -> Result<()> {
        let results: Vec<serde_json::Value> = diagnostics
            .iter()
            .map(|d| {
                serde_json::json!({
                    "ruleId": d.code(),
                    "level": match d.severity {
                        Severity::Error => "error",
                        Severity::Warning => "warning",
                        Severity::Info | Severity::Hint => "note",
                    },
                    "message": {
                        "text": d.message
                    },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": {
                                "uri": self.file_name
                            },
                            "region": {
                                "startLine": d.span.line,
                                "startColumn": d.span.column,
                                "endLine": d.span.end_line,
                                "endColumn": d.span.end_column
                            }
                        }
                    }]
                })
            })
            .collect();

        let sarif = serde_json::json!({
            "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            "version": "2.1.0",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "sqlsight",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                },
                "results": results
            }]
        });

        print_pretty(&sarif)
    }
}

/// One candidate per line: label, kind, detail
pub fn print_completions(items: &[CompletionItem], json: bool) -> Result<()> {
    if json {
        return print_pretty(&items);
    }
    let width = items.iter().map(|i| i.label.chars().count()).max().unwrap_or(0);
    for item in items {
        let kind = serde_json::to_value(item.kind).into_diagnostic()?;
        println!(
            "{:<width$}  {:<14}  {}",
            item.label,
            kind.as_str().unwrap_or_default(),
            item.detail,
            width = width
        );
    }
    Ok(())
}

pub fn print_hover(hover: Option<&Hover>, json: bool) -> Result<()> {
    match (hover, json) {
        (hover, true) => print_pretty(&hover),
        (Some(hover), false) => {
            println!("{}", hover.content.to_markdown());
            Ok(())
        }
        (None, false) => Ok(()),
    }
}

pub fn print_pretty<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.saturating_sub(1))
}
