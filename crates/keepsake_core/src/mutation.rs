//! Stage mutations produced by executors and the outcome of applying them.

use crate::{CompressionTier, MediaRecord, Stage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A requested stage advance plus the fields that change with it.
///
/// # Examples
///
/// ```
/// use keepsake_core::{Mutation, Stage};
///
/// let mutation = Mutation::advance_to(Stage::ReplicatedA).with_replica("nas");
/// assert_eq!(mutation.target(), &Stage::ReplicatedA);
/// assert_eq!(mutation.add_replica().as_deref(), Some("nas"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Mutation {
    /// Stage the record moves to
    target: Stage,
    /// Destination that confirmed a copy
    add_replica: Option<String>,
    /// New local file location
    local_path: Option<PathBuf>,
    /// New local file size
    byte_size_current: Option<u64>,
    /// Tier applied by compression
    compression_tier: Option<CompressionTier>,
    /// Token from staging deletion at the source
    deletion_token: Option<String>,
}

impl Mutation {
    /// Start a mutation that moves the record to `target`.
    pub fn advance_to(target: Stage) -> Self {
        Self {
            target,
            add_replica: None,
            local_path: None,
            byte_size_current: None,
            compression_tier: None,
            deletion_token: None,
        }
    }

    /// Record a confirmed destination.
    pub fn with_replica(mut self, destination: impl Into<String>) -> Self {
        self.add_replica = Some(destination.into());
        self
    }

    /// Point the record at a new local file.
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Record the new local file size.
    pub fn with_byte_size_current(mut self, bytes: u64) -> Self {
        self.byte_size_current = Some(bytes);
        self
    }

    /// Record the compression tier applied.
    pub fn with_compression_tier(mut self, tier: CompressionTier) -> Self {
        self.compression_tier = Some(tier);
        self
    }

    /// Record the deletion token from the source.
    pub fn with_deletion_token(mut self, token: impl Into<String>) -> Self {
        self.deletion_token = Some(token.into());
        self
    }
}

/// A mutation that would break a lifecycle invariant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("record {} cannot move from {} to {}: {}", record_id, from, to, reason)]
pub struct TransitionRejected {
    /// Record the mutation targeted
    pub record_id: String,
    /// Stage the record is in
    pub from: Stage,
    /// Stage the mutation asked for
    pub to: Stage,
    /// What was wrong
    pub reason: String,
}

/// Outcome of a compare-and-swap stage update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionResult {
    /// The record was still at the expected stage and has been updated
    Applied(MediaRecord),
    /// Another worker moved the record first
    Conflict {
        /// Stage found at write time
        current_stage: Stage,
    },
}

impl TransitionResult {
    /// Whether the update was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionResult::Applied(_))
    }
}

/// Outcome of recording an acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertResult {
    /// This call inserted the record
    Created(MediaRecord),
    /// The source reference was already recorded; the record is unchanged
    Existing(MediaRecord),
}

impl UpsertResult {
    /// Whether this call inserted the record.
    pub fn is_created(&self) -> bool {
        matches!(self, UpsertResult::Created(_))
    }

    /// The record now on file.
    pub fn record(&self) -> &MediaRecord {
        match self {
            UpsertResult::Created(record) | UpsertResult::Existing(record) => record,
        }
    }

    /// Consume into the record now on file.
    pub fn into_record(self) -> MediaRecord {
        match self {
            UpsertResult::Created(record) | UpsertResult::Existing(record) => record,
        }
    }
}
