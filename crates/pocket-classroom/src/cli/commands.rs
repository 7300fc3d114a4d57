//! CLI command definitions.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand, ValueEnum};

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Capsule id
    pub id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Save command arguments.
#[derive(Debug, Args)]
pub struct SaveCommand {
    /// Capsule JSON document (new, or with an existing id to update)
    pub file: PathBuf,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Capsule id
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Capsule id
    pub id: String,

    /// Output file (defaults to a name derived from the title)
    #[arg(short, long, value_name = "FILE", conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write the export to stdout
    #[arg(long)]
    pub stdout: bool,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Exported capsule file
    pub file: PathBuf,
}

/// Progress command arguments.
#[derive(Debug, Args)]
pub struct ProgressCommand {
    /// Capsule id
    pub id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Mark command arguments.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("status").required(true).args(["known", "unknown"])))]
pub struct MarkCommand {
    /// Capsule id
    pub id: String,

    /// Flashcard position (0-based)
    pub index: usize,

    /// Mark the card as known
    #[arg(long)]
    pub known: bool,

    /// Mark the card as not yet known
    #[arg(long)]
    pub unknown: bool,
}

/// Score command arguments.
#[derive(Debug, Args)]
pub struct ScoreCommand {
    /// Capsule id
    pub id: String,

    /// Quiz score, 0-100
    pub score: u32,
}

/// Quiz command arguments.
#[derive(Debug, Args)]
pub struct QuizCommand {
    /// Capsule id
    pub id: String,

    /// Chosen option per question (0-based, comma separated; '-' to skip)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub answers: Vec<String>,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Capsule id
    pub id: String,

    /// Text to look for in notes
    pub query: String,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

/// Parse `--answers` values, where `-` or an empty value means skipped.
///
/// # Errors
///
/// Returns the offending value if it is neither a number nor a skip marker.
pub fn parse_answers(raw: &[String]) -> Result<Vec<Option<usize>>, String> {
    raw.iter()
        .map(|value| match value.trim() {
            "" | "-" => Ok(None),
            v => v
                .parse()
                .map(Some)
                .map_err(|_| format!("invalid answer '{v}'")),
        })
        .collect()
}
