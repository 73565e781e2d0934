//! Keepsake moves media files through a durable lifecycle.
//!
//! Each file is acquired from its source, copied to two independent
//! destinations, compressed according to its age, and only then deleted at
//! the source. Progress lives in a ledger, so a pass can be interrupted at
//! any point and resumed by the next one.
//!
//! This crate re-exports the workspace:
//!
//! - [`keepsake_core`]: records, stages, mutations and reports
//! - [`keepsake_interface`]: the ledger and collaborator traits
//! - [`keepsake_database`]: the SQLite ledger
//! - [`keepsake_storage`]: local files, directory replicas and ffmpeg
//! - [`keepsake_pipeline`]: executors, configuration and the [`Orchestrator`]
//!
//! # Example
//!
//! ```no_run
//! use keepsake::{PipelineConfig, SqliteLedger};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::load("keepsake.toml")?;
//! let ledger = SqliteLedger::open(
//!     config.ledger().path(),
//!     *config.ledger().pool_size(),
//!     config.replica_policy(),
//! )?;
//! # let _ = ledger;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod cli;
pub mod observability;

pub use keepsake_core::*;
pub use keepsake_error::*;
pub use keepsake_interface::*;

pub use keepsake_database::{DatabaseResult, SqliteLedger};
pub use keepsake_pipeline::{
    AcquireExecutor, AcquireOutcome, ChannelNotifier, CompressExecutor, CompressionConfig,
    DestinationsConfig, InMemoryLedger, LedgerConfig, LimitsConfig, LoggingConfig, Notification,
    Orchestrator, OrchestratorBuilder, PipelineConfig, ReplicateExecutor, RetireExecutor,
    StageExecutor, StageOutcome, StorageConfig, TracingNotifier,
};
pub use keepsake_storage::{
    CompressionProfile, DirectoryReplicationTarget, FfmpegCompressor, LocalMediaStore, MediaKind,
};
