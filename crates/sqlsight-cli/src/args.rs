//! CLI argument definitions

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlsight")]
#[command(author, version, about = "Tolerant SQL analysis: diagnostics, completion and hover")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Schema and dialect options shared by the analysis commands
#[derive(ClapArgs, Clone, Default)]
pub struct SchemaArgs {
    /// Schema files: `.json`, `.toml`, or SQL DDL
    #[arg(short, long = "schema", value_name = "FILE")]
    pub schema: Vec<PathBuf>,

    /// Directory searched for `*.sql` DDL files
    #[arg(long = "schema-dir", value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// SQL dialect (postgresql, mysql, db2)
    #[arg(short, long)]
    pub dialect: Option<String>,

    /// Path to a sqlsight.toml (searched upward from the current directory
    /// when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// A cursor position in a file
#[derive(ClapArgs, Clone)]
pub struct Position {
    /// SQL file
    pub file: PathBuf,

    /// Line (1-based)
    #[arg(short, long)]
    pub line: usize,

    /// Column (1-based, in characters)
    #[arg(short = 'C', long)]
    pub column: usize,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check SQL files for structural problems and schema mismatches
    Check {
        /// SQL files to check (supports glob patterns)
        files: Vec<PathBuf>,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Diagnostic codes to suppress (e.g. E1007)
        #[arg(long, value_name = "CODE")]
        disable: Vec<String>,
    },

    /// List completion candidates at a position
    Complete {
        #[command(flatten)]
        position: Position,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Maximum number of candidates to print
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show hover information at a position
    Hover {
        #[command(flatten)]
        position: Position,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Print JSON instead of markdown
        #[arg(long)]
        json: bool,
    },

    /// Display schema information
    Schema {
        /// Schema files: `.json`, `.toml`, or SQL DDL
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// SQL dialect used to parse DDL files
        #[arg(short, long)]
        dialect: Option<String>,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the named subqueries of a file as JSON
    Outline {
        /// SQL file
        file: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// SARIF output (for GitHub Code Scanning)
    Sarif,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}
