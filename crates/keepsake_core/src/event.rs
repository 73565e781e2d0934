//! Lifecycle events delivered to notifiers.

use crate::{MediaRecord, PipelineStage, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new record entered the ledger
    #[display("acquired")]
    Acquired,
    /// The record moved to a new stage
    #[display("advanced")]
    Advanced,
    /// An executor failed on the record
    #[display("failed")]
    Failed,
    /// The record was excluded from automatic processing
    #[display("quarantined")]
    Quarantined,
}

/// A notification about one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct LifecycleEvent {
    /// Record identifier
    record_id: String,
    /// Stage the record is in after the event
    stage: Stage,
    /// Pipeline step that produced the event
    pipeline_stage: PipelineStage,
    /// What happened
    kind: EventKind,
    /// When it happened
    timestamp: DateTime<Utc>,
    /// Failure message, for failures and quarantines
    error: Option<String>,
}

impl LifecycleEvent {
    /// Build an event describing `record` as it is now.
    pub fn for_record(
        record: &MediaRecord,
        pipeline_stage: PipelineStage,
        kind: EventKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let error = match kind {
            EventKind::Failed | EventKind::Quarantined => record.last_error().clone(),
            EventKind::Acquired | EventKind::Advanced => None,
        };
        Self {
            record_id: record.id().clone(),
            stage: *record.stage(),
            pipeline_stage,
            kind,
            timestamp,
            error,
        }
    }
}
