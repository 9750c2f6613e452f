//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, groups::GroupsCommands,
    lookup::LookupCommands, status::StatusArgs,
};

#[derive(Parser)]
#[command(name = "nimbus-reports")]
#[command(author, version, about = "Nimbus reference data and location group resolver")]
#[command(long_about = "Loads Nimbus lookup tables and the location group hierarchy, resolves group selections into location sets, and prints them for reporting.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Read entity sets from a JSON snapshot instead of the OData API
    #[arg(long, global = true, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Location group hierarchy queries
    #[command(subcommand)]
    Groups(GroupsCommands),

    /// Reference lookup tables
    #[command(subcommand)]
    Lookup(LookupCommands),

    /// Load all reference data and show cache status
    Status(StatusArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned table for terminals
    #[default]
    Auto,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
}
