//! Trait definitions for the Keepsake ledger and its collaborators.
//!
//! The orchestrator only talks to the outside world through these seams:
//! the [`LedgerStore`] it persists to, and the collaborators stage
//! executors call into. All are object safe and used as `Arc<dyn Trait>`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod collaborators;
mod ledger;
mod notifier;
mod types;

pub use collaborators::{Compressor, DeletionService, ReplicationTarget, SourceService};
pub use ledger::LedgerStore;
pub use notifier::Notifier;
pub use types::{CompressedMedia, ReplicationRequest};
