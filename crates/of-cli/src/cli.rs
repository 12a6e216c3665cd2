//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ontoforge - semantic metadata for relational databases
#[derive(Parser, Debug)]
#[command(name = "ontoforge")]
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

    /// Project directory holding ontoforge.yml
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Ontology to operate on
    #[arg(short = 'o', long, global = true, env = "ONTOFORGE_ONTOLOGY_ID")]
    pub ontology: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full extraction over the data source
    Extract(ExtractArgs),

    /// Resume a crashed or transiently failed run
    Resume(ResumeArgs),

    /// Show the state of a run
    Status(StatusArgs),

    /// Diff the live schema against the stored snapshot
    Refresh(RefreshArgs),

    /// Review detected schema changes
    Changes(ChangesArgs),
}

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Print progress events as they arrive
    #[arg(long)]
    pub progress: bool,
}

/// Arguments for the resume command
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Run to resume (default: the most recent run)
    pub run_id: Option<String>,

    /// Print progress events as they arrive
    #[arg(long)]
    pub progress: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Run to show (default: the most recent run)
    pub run_id: Option<String>,
}

/// Arguments for the refresh command
#[derive(Args, Debug)]
pub struct RefreshArgs {}

/// Arguments for the changes command
#[derive(Args, Debug)]
pub struct ChangesArgs {
    #[command(subcommand)]
    pub command: ChangesCommands,
}

/// Pending change subcommands
#[derive(Subcommand, Debug)]
pub enum ChangesCommands {
    /// List detected changes
    List {
        /// Only changes with this status
        #[arg(short, long, value_enum)]
        status: Option<StatusFilter>,
    },

    /// Approve a pending change and apply its suggested action
    Approve {
        /// Change id
        id: i64,
    },

    /// Reject a pending change
    Reject {
        /// Change id
        id: i64,

        /// Why the change was rejected
        #[arg(short, long)]
        reason: String,
    },
}

/// Change status filter
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Approved,
    Rejected,
    AutoApplied,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
