//! The media record tracked by the ledger.

use crate::{
    CompressionTier, EligibilityQuery, Failure, Mutation, ReplicaFlags, ReplicaPolicy, Stage,
    TransitionRejected,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the source service reports about a freshly downloaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct AcquiredAttrs {
    /// Where the download landed
    local_path: PathBuf,
    /// Size of the downloaded file in bytes
    byte_size: u64,
    /// Original content creation time
    created_at: DateTime<Utc>,
}

impl AcquiredAttrs {
    /// Create acquisition attributes.
    pub fn new(local_path: impl Into<PathBuf>, byte_size: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            local_path: local_path.into(),
            byte_size,
            created_at,
        }
    }
}

/// One distinct source file and its place in the lifecycle.
///
/// Records are never deleted. Once `Retired`, the local file is gone and
/// `local_path` is `None`, but the row stays for audit.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use keepsake_core::{MediaRecord, Stage};
///
/// let now = Utc::now();
/// let record = MediaRecord::builder()
///     .id("r1")
///     .source_reference("photo123")
///     .created_at(now)
///     .byte_size_original(1024u64)
///     .byte_size_current(1024u64)
///     .stage(Stage::Acquired)
///     .acquired_at(now)
///     .updated_at(now)
///     .build()
///     .unwrap();
///
/// assert_eq!(record.stage(), &Stage::Acquired);
/// assert_eq!(*record.error_count(), 0);
/// assert!(!record.quarantined());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct MediaRecord {
    /// Stable identifier assigned at acquisition
    id: String,
    /// Identifier of the file at its origin
    source_reference: String,
    /// Current local file, released at retirement
    #[builder(default)]
    local_path: Option<PathBuf>,
    /// Original content creation time
    created_at: DateTime<Utc>,
    /// Size when acquired
    byte_size_original: u64,
    /// Size after the latest mutation
    byte_size_current: u64,
    /// Lifecycle stage
    stage: Stage,
    /// Destinations that confirmed a durable copy
    #[builder(default)]
    replica_flags: ReplicaFlags,
    /// Tier applied by compression
    #[builder(default)]
    compression_tier: Option<CompressionTier>,
    /// Token returned when deletion was staged at the source
    #[builder(default)]
    deletion_token: Option<String>,
    /// Consecutive failures since the last successful transition
    #[builder(default)]
    error_count: u32,
    /// Most recent failure message
    #[builder(default)]
    last_error: Option<String>,
    /// Time of the most recent executor outcome
    #[builder(default)]
    last_attempt_at: Option<DateTime<Utc>>,
    /// Excluded from automatic processing until released
    #[builder(default)]
    quarantined: bool,
    /// When the record was created
    acquired_at: DateTime<Utc>,
    /// Last mutation time
    updated_at: DateTime<Utc>,
}

impl MediaRecord {
    /// Creates a new record builder.
    pub fn builder() -> MediaRecordBuilder {
        MediaRecordBuilder::default()
    }

    /// A freshly acquired record.
    pub fn acquired(
        id: impl Into<String>,
        source_reference: impl Into<String>,
        attrs: &AcquiredAttrs,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            source_reference: source_reference.into(),
            local_path: Some(attrs.local_path().clone()),
            created_at: *attrs.created_at(),
            byte_size_original: *attrs.byte_size(),
            byte_size_current: *attrs.byte_size(),
            stage: Stage::Acquired,
            replica_flags: ReplicaFlags::default(),
            compression_tier: None,
            deletion_token: None,
            error_count: 0,
            last_error: None,
            last_attempt_at: None,
            quarantined: false,
            acquired_at: now,
            updated_at: now,
        }
    }

    /// The record after a failed attempt. The stage never changes.
    pub fn with_failure(&self, failure: &Failure, max_failures: u32, now: DateTime<Utc>) -> Self {
        let error_count = self.error_count.saturating_add(1);
        Self {
            error_count,
            last_error: Some(failure.message().clone()),
            last_attempt_at: Some(now),
            quarantined: self.quarantined || failure.quarantines(error_count, max_failures),
            updated_at: now,
            ..self.clone()
        }
    }

    /// The record after an operator releases it from quarantine.
    ///
    /// `last_error` is kept for audit.
    pub fn released(&self, now: DateTime<Utc>) -> Self {
        Self {
            quarantined: false,
            error_count: 0,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Whether the record satisfies an eligibility query, ignoring `limit`.
    pub fn matches(&self, query: &EligibilityQuery) -> bool {
        if self.quarantined || !query.stages().contains(&self.stage) {
            return false;
        }
        match query.missing_replica() {
            Some(destination) => !self.replica_flags.contains(destination),
            None => true,
        }
    }

    /// Bytes saved by compression so far.
    pub fn bytes_saved(&self) -> u64 {
        self.byte_size_original.saturating_sub(self.byte_size_current)
    }

    /// The record after applying `mutation`, or why it may not be applied.
    ///
    /// This is the only place stage changes are computed. The caller is
    /// responsible for the compare-and-swap on `stage`.
    ///
    /// - `mutation.target` must be a legal forward edge from the current stage
    /// - replica flags are unioned, never removed, and must justify the target
    /// - `Compressed` needs a compression tier, `RetirementStaged` a deletion token
    /// - entering `Retired` releases `local_path`
    /// - a successful transition resets the consecutive failure count
    pub fn transition(
        &self,
        mutation: &Mutation,
        policy: &ReplicaPolicy,
        now: DateTime<Utc>,
    ) -> Result<MediaRecord, TransitionRejected> {
        let target = *mutation.target();
        let reject = |reason: String| TransitionRejected {
            record_id: self.id.clone(),
            from: self.stage,
            to: target,
            reason,
        };

        if !self.stage.can_advance_to(target) {
            return Err(reject("not a forward edge of the lifecycle".to_string()));
        }

        let mut replica_flags = self.replica_flags.clone();
        if let Some(destination) = mutation.add_replica() {
            if !policy.is_known(destination) {
                return Err(reject(format!("unknown destination '{}'", destination)));
            }
            replica_flags.insert(destination.clone());
        }

        match target {
            Stage::ReplicatedA | Stage::ReplicatedB | Stage::ReplicatedBoth => {
                if policy.stage_for(&replica_flags) != Some(target) {
                    return Err(reject(format!(
                        "replica flags [{}] do not justify {}",
                        replica_flags.to_column(),
                        target
                    )));
                }
            }
            _ => {
                if !policy.is_satisfied_by(&replica_flags) {
                    return Err(reject(format!(
                        "replica flags [{}] do not cover both destinations",
                        replica_flags.to_column()
                    )));
                }
            }
        }

        let compression_tier = mutation.compression_tier().or(self.compression_tier);
        if target == Stage::Compressed && mutation.compression_tier().is_none() {
            return Err(reject("compression tier missing".to_string()));
        }

        let deletion_token = mutation
            .deletion_token()
            .clone()
            .or_else(|| self.deletion_token.clone());
        if target == Stage::RetirementStaged && deletion_token.is_none() {
            return Err(reject("deletion token missing".to_string()));
        }

        let local_path = if target == Stage::Retired {
            None
        } else {
            mutation.local_path().clone().or_else(|| self.local_path.clone())
        };
        if target.holds_local_file() && local_path.is_none() {
            return Err(reject("local file missing".to_string()));
        }

        Ok(Self {
            local_path,
            byte_size_current: mutation
                .byte_size_current()
                .unwrap_or(self.byte_size_current),
            stage: target,
            replica_flags,
            compression_tier,
            deletion_token,
            error_count: 0,
            last_attempt_at: Some(now),
            updated_at: now,
            ..self.clone()
        })
    }
}
