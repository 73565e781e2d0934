//! Core data model for the Keepsake media lifecycle pipeline.
//!
//! A [`MediaRecord`] tracks one source file through the lifecycle
//! `Acquired → {ReplicatedA, ReplicatedB} → ReplicatedBoth → Compressed →
//! RetirementStaged → Retired`. Every change to a record goes through
//! [`MediaRecord::transition`], which both ledger implementations share.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod event;
mod failure;
mod mutation;
mod query;
mod record;
mod replica;
mod report;
mod stage;
mod tier;

pub use event::{EventKind, LifecycleEvent};
pub use failure::{Failure, FailureClass};
pub use mutation::{Mutation, TransitionRejected, TransitionResult, UpsertResult};
pub use query::EligibilityQuery;
pub use record::{AcquiredAttrs, MediaRecord, MediaRecordBuilder, MediaRecordBuilderError};
pub use replica::{ReplicaFlags, ReplicaPolicy, ReplicaSlot};
pub use report::{LedgerStats, PassReport, PassRun, StageReport};
pub use stage::{PipelineStage, Stage};
pub use tier::{CompressionTier, TierBoundaries};
