//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Keepsake - durable media lifecycle ledger
#[derive(Parser, Debug)]
#[command(name = "keepsake")]
#[command(about = "Inspect and maintain the Keepsake media ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Pipeline configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "KEEPSAKE_CONFIG",
        default_value = "keepsake.toml"
    )]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create the ledger or apply pending migrations
    Init,

    /// Record counts per stage and the most recent passes
    Status {
        /// Number of journaled passes to show
        #[arg(long, default_value = "5")]
        passes: usize,
    },

    /// Show one record
    Show {
        /// Record id or source reference
        record: String,
    },

    /// List quarantined records, most recently updated first
    Quarantined {
        /// Maximum number of records to display
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Return a quarantined record to automatic processing
    Release {
        /// Record id
        id: String,
    },

    /// Write a consistent copy of the ledger to a new file
    Backup {
        /// Destination file, must not exist
        destination: PathBuf,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format
    #[default]
    Human,
    /// JSON format
    Json,
}
