//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::table::SortDirection;

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Width of the rendered progress track in characters
    #[arg(long, default_value = "60")]
    pub columns: usize,

    /// Run without drawing the board; only log output is written
    #[arg(long)]
    pub headless: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Sort command arguments.
#[derive(Debug, Args)]
pub struct SortCommand {
    /// Zero-based index of the column to sort by
    pub column: usize,

    /// Sort descending instead of ascending
    #[arg(short, long)]
    pub desc: bool,
}

impl SortCommand {
    /// The requested direction.
    #[must_use]
    pub fn direction(&self) -> SortDirection {
        if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Reset command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
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
