//! Command-line interface for pocket-classroom.
//!
//! This module provides the CLI structure for the `pocketc` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    parse_answers, ConfigCommand, DeleteCommand, ExportCommand, ImportCommand, ListCommand,
    MarkCommand, OutputFormat, ProgressCommand, QuizCommand, SaveCommand, ScoreCommand,
    SearchCommand, ShowCommand, StatsCommand,
};

/// pocketc - Study capsules on your own machine
///
/// Create capsules of notes, flashcards, quiz questions and links, study
/// them, and move them between machines as JSON exports.
#[derive(Debug, Parser)]
#[command(name = "pocketc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use a throwaway in-memory store instead of the database
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List capsules, newest first
    List(ListCommand),

    /// Show a capsule
    Show(ShowCommand),

    /// Create or update a capsule from a JSON file
    Save(SaveCommand),

    /// Delete a capsule and its progress
    Delete(DeleteCommand),

    /// Export a capsule to a JSON file
    Export(ExportCommand),

    /// Import an exported capsule as a new capsule
    Import(ImportCommand),

    /// Show study progress for a capsule
    Progress(ProgressCommand),

    /// Mark a flashcard as known or unknown
    Mark(MarkCommand),

    /// Record a quiz score
    Score(ScoreCommand),

    /// Grade quiz answers and record the score
    Quiz(QuizCommand),

    /// Search a capsule's notes
    Search(SearchCommand),

    /// Show storage statistics
    Stats(StatsCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
