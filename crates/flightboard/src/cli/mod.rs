//! Command-line interface for flightboard.
//!
//! This module provides the CLI structure for the `flightboard` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{ConfigCommand, ResetCommand, RunCommand, SortCommand, StatusCommand};

/// flightboard - Live flight progress board
///
/// Polls plain-text flight data, shows progress along the route and keeps
/// the flight table sorted.
#[derive(Debug, Parser)]
#[command(name = "flightboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the board until interrupted
    Run(RunCommand),

    /// Show persisted progress and sort state
    Status(StatusCommand),

    /// Sort the flight table once and persist the choice
    Sort(SortCommand),

    /// Clear persisted state
    Reset(ResetCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
