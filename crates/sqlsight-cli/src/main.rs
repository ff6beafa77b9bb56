//! sqlsight CLI - tolerant SQL analysis from the command line

mod args;
mod config;
mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use sqlsight_core::{
    complete, hover, parse_subqueries, position_to_offset, Analyzer, Catalog, SchemaBuilder,
    Severity, SqlDialect,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command, OutputFormat, Position, SchemaArgs};
use crate::config::Config;
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match (args.quiet, args.verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::INFO,
        (false, 2) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let quiet = args.quiet;
    match args.command {
        Command::Check {
            files,
            schema,
            format,
            disable,
        } => {
            let config = Config::load(schema.config.as_deref())?
                .merge_with_args(&schema, &files, format, &disable);
            let dialect = parse_dialect(config.dialect.as_deref())?;

            let output_format = match &config.format {
                Some(fmt) => fmt
                    .parse::<OutputFormat>()
                    .map_err(|e| miette::miette!(e))?,
                None => OutputFormat::Human,
            };

            let catalog = load_catalog(&schema_files(&config)?, dialect)?;
            if catalog.is_none() {
                debug!("no schema given, running structural checks only");
            }

            let query_files = expand_patterns(&config.files)?;
            if query_files.is_empty() {
                miette::bail!(
                    "No query files specified. Use positional arguments or configure in sqlsight.toml"
                );
            }

            let mut total_errors = 0;
            let mut total_warnings = 0;
            let mut analyzer = match &catalog {
                Some(catalog) => Analyzer::with_catalog(catalog),
                None => Analyzer::new(),
            }
            .with_dialect(dialect);

            for query_file in &query_files {
                let content = fs::read_to_string(query_file).into_diagnostic()?;
                let diagnostics: Vec<_> = analyzer
                    .analyze(&content)
                    .into_iter()
                    .filter(|d| !config.disable.iter().any(|code| code == d.code()))
                    .collect();

                if !diagnostics.is_empty() || output_format != OutputFormat::Human {
                    let formatter =
                        OutputFormatter::new(output_format, query_file.display().to_string());
                    formatter.print_diagnostics(&diagnostics, &content)?;
                }

                for diag in &diagnostics {
                    match diag.severity {
                        Severity::Error => total_errors += 1,
                        Severity::Warning => total_warnings += 1,
                        Severity::Info | Severity::Hint => {}
                    }
                }
            }

            if !quiet {
                if total_errors > 0 || total_warnings > 0 {
                    eprintln!();
                    eprintln!(
                        "Found {} error(s), {} warning(s) in {} file(s)",
                        total_errors,
                        total_warnings,
                        query_files.len()
                    );
                } else {
                    eprintln!("All {} file(s) passed validation", query_files.len());
                }
            }

            Ok(total_errors > 0)
        }

        Command::Complete {
            position,
            schema,
            limit,
            json,
        } => {
            let (content, offset) = read_position(&position)?;
            let (catalog, dialect) = editor_context(&schema)?;
            let mut items = complete(&content, offset, catalog.as_ref(), dialect);
            items.truncate(limit);
            output::print_completions(&items, json)?;
            Ok(false)
        }

        Command::Hover {
            position,
            schema,
            json,
        } => {
            let (content, offset) = read_position(&position)?;
            let (catalog, dialect) = editor_context(&schema)?;
            let found = hover(&content, offset, catalog.as_ref(), dialect);
            output::print_hover(found.as_ref(), json)?;
            Ok(false)
        }

        Command::Schema {
            files,
            dialect,
            json,
        } => {
            let dialect = parse_dialect(dialect.as_deref())?;
            let catalog = load_catalog(&files, dialect)?.unwrap_or_default();

            if json {
                output::print_pretty(&catalog)?;
                return Ok(false);
            }

            println!("Schema Information:");
            println!("==================");
            for schema in catalog.schemas.values() {
                let name = if schema.name.is_empty() {
                    "(unnamed)"
                } else {
                    schema.name.as_str()
                };
                println!("\nSchema: {}", name);
                for table in schema.tables.values() {
                    println!("  {}: {}", capitalize(table.kind_label()), table.name);
                    for column in &table.columns {
                        println!("    - {} {}", column.name, column.summary());
                    }
                }
            }

            Ok(false)
        }

        Command::Outline { file } => {
            let content = fs::read_to_string(&file).into_diagnostic()?;
            output::print_pretty(&parse_subqueries(&content))?;
            Ok(false)
        }
    }
}

fn parse_dialect(name: Option<&str>) -> Result<SqlDialect> {
    match name {
        Some(name) => name.parse().map_err(|e: String| miette::miette!(e)),
        None => Ok(SqlDialect::default()),
    }
}

/// Catalog and dialect for `complete`/`hover`, honouring sqlsight.toml
fn editor_context(schema: &SchemaArgs) -> Result<(Option<Catalog>, SqlDialect)> {
    let config = Config::load(schema.config.as_deref())?.merge_with_args(schema, &[], None, &[]);
    let dialect = parse_dialect(config.dialect.as_deref())?;
    let catalog = load_catalog(&schema_files(&config)?, dialect)?;
    Ok((catalog, dialect))
}

fn read_position(position: &Position) -> Result<(String, usize)> {
    let content = fs::read_to_string(&position.file).into_diagnostic()?;
    let offset = position_to_offset(&content, position.line, position.column);
    Ok((content, offset))
}

/// Schema files named in the configuration plus the DDL under `schema_dir`
fn schema_files(config: &Config) -> Result<Vec<PathBuf>> {
    let mut files = expand_patterns(&config.schema)?;
    if let Some(dir) = &config.schema_dir {
        let pattern = format!("{}/**/*.sql", dir);
        files.extend(glob::glob(&pattern).into_diagnostic()?.flatten());
    }
    Ok(files)
}

fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if pattern.contains(['*', '?', '[']) {
            paths.extend(glob::glob(pattern).into_diagnostic()?.flatten());
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

/// Merge every schema file into one catalog. `.json` and `.toml` files are
/// schema descriptions; anything else is read as DDL.
fn load_catalog(files: &[PathBuf], dialect: SqlDialect) -> Result<Option<Catalog>> {
    if files.is_empty() {
        return Ok(None);
    }

    let mut builder = SchemaBuilder::with_dialect(dialect);
    let mut described: Vec<Catalog> = Vec::new();

    for file in files {
        let content = fs::read_to_string(file).into_diagnostic()?;
        match extension(file).as_deref() {
            Some("json") => described.push(Catalog::from_json(&content).into_diagnostic()?),
            Some("toml") => described.push(Catalog::from_toml(&content).into_diagnostic()?),
            _ => match builder.parse(&content) {
                Ok(count) => debug!(file = %file.display(), statements = count, "loaded DDL"),
                Err(err) => warn!(file = %file.display(), "{}", err),
            },
        }
    }

    let mut catalog = builder.build();
    for other in described {
        if other.default_schema.is_some() {
            catalog.default_schema = other.default_schema.clone();
        }
        catalog.show_schema_prefix |= other.show_schema_prefix;
        for table in other.tables() {
            catalog.add_table(table.clone());
        }
    }
    Ok(Some(catalog))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
