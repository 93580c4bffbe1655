//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: refresh every enabled target (default)
//! - targets: list configured targets

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Freshen - keeps profile text fields looking recently updated
#[derive(Parser, Debug)]
#[command(name = "freshen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Subcommand to run, `run` when none was given.
    pub fn action(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run { dry_run: false })
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Refresh every enabled target and print the run summary as JSON
    Run {
        /// Use the local file backend regardless of configuration
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// List configured targets
    Targets,
}
