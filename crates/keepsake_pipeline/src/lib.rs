//! Stage executors and the pass orchestrator for the Keepsake pipeline.
//!
//! - [`PipelineConfig`]: validated configuration loaded from TOML and the environment
//! - [`StageExecutor`]: one record-driven pipeline step, plus the four implementations
//! - [`Orchestrator`]: runs passes, applying outcomes to a [`LedgerStore`]
//! - [`InMemoryLedger`]: a process-local ledger for single-process use and tests
//! - [`TracingNotifier`], [`ChannelNotifier`]: built-in event sinks
//!
//! [`LedgerStore`]: keepsake_interface::LedgerStore

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod executor;
mod executors;
mod in_memory;
mod notifier;
mod orchestrator;

pub use config::{
    CompressionConfig, DestinationsConfig, LedgerConfig, LimitsConfig, LimitsConfigBuilder,
    LoggingConfig, PipelineConfig, StorageConfig,
};
pub use executor::{StageExecutor, StageOutcome};
pub use executors::{
    AcquireExecutor, AcquireOutcome, CompressExecutor, ReplicateExecutor, RetireExecutor,
};
pub use in_memory::InMemoryLedger;
pub use notifier::{ChannelNotifier, Notification, TracingNotifier};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
