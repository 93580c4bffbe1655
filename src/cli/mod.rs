//! CLI module for freshen - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
