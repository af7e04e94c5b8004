//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use wm_core::DriftPolicy;

/// Waymark - ordered, journaled SQL migrations
#[derive(Parser, Debug)]
#[command(name = "wm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the migration script path
    #[arg(short, long, global = true)]
    pub file: Option<String>,

    /// Database to migrate: a postgres:// URL or a DuckDB file path
    #[arg(long, global = true, env = "WAYMARK_DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending steps of the migration script
    Migrate(MigrateArgs),

    /// List the steps of the migration script
    Ls(LsArgs),

    /// Compare the migration script with the journal
    Status(StatusArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// What to do when an applied step has changed
    #[arg(long)]
    pub drift_policy: Option<DriftPolicy>,

    /// Keep going after a failed step
    #[arg(long)]
    pub no_stop_on_error: bool,

    /// Seed for the advisory lock id
    #[arg(long)]
    pub lock_key: Option<String>,

    /// Per-statement timeout in seconds
    #[arg(long)]
    pub statement_timeout: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
