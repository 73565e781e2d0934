//! Copies local files to one of the two replication destinations.

use crate::{StageExecutor, StageOutcome};
use async_trait::async_trait;
use keepsake_core::{
    EligibilityQuery, MediaRecord, Mutation, PipelineStage, ReplicaPolicy, ReplicaSlot,
};
use keepsake_error::{StorageError, StorageErrorKind};
use keepsake_interface::{ReplicationRequest, ReplicationTarget};
use keepsake_storage::LocalMediaStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The replicate step for one slot.
///
/// Slot A accepts records at `Acquired` or `ReplicatedB`, slot B accepts
/// `Acquired` or `ReplicatedA`, in both cases only while the slot's own
/// destination is missing from the replica flags. The new stage is derived
/// from the resulting flag set, so the second confirmation lands on
/// `ReplicatedBoth`.
#[derive(Clone)]
pub struct ReplicateExecutor {
    slot: ReplicaSlot,
    target: Arc<dyn ReplicationTarget>,
    policy: ReplicaPolicy,
    store: LocalMediaStore,
}

impl std::fmt::Debug for ReplicateExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateExecutor")
            .field("slot", &self.slot)
            .field("destination", &self.destination())
            .finish_non_exhaustive()
    }
}

impl ReplicateExecutor {
    /// Create the step for `slot`.
    pub fn new(
        slot: ReplicaSlot,
        target: Arc<dyn ReplicationTarget>,
        policy: ReplicaPolicy,
        store: LocalMediaStore,
    ) -> Self {
        Self {
            slot,
            target,
            policy,
            store,
        }
    }

    /// Slot served.
    pub fn slot(&self) -> ReplicaSlot {
        self.slot
    }

    /// Destination identifier configured for the slot.
    pub fn destination(&self) -> &str {
        self.policy.destination(self.slot)
    }
}

#[async_trait]
impl StageExecutor for ReplicateExecutor {
    fn pipeline_stage(&self) -> PipelineStage {
        match self.slot {
            ReplicaSlot::A => PipelineStage::ReplicateA,
            ReplicaSlot::B => PipelineStage::ReplicateB,
        }
    }

    fn query(&self, limit: usize) -> EligibilityQuery {
        EligibilityQuery::new(self.pipeline_stage().entry_stages(), limit)
            .missing_destination(self.destination())
    }

    #[instrument(skip_all, fields(record_id = %record.id(), destination = %self.destination()))]
    async fn execute(&self, record: &MediaRecord) -> StageOutcome {
        let Some(local_path) = record.local_path() else {
            return StageOutcome::failed(StorageError::new(StorageErrorKind::Missing(format!(
                "record {} has no local file",
                record.id()
            ))));
        };
        let resolved = self.store.resolve(local_path);
        if let Err(e) = self.store.file_size(&resolved).await {
            return StageOutcome::Failed(e);
        }

        let Some(request) = ReplicationRequest::for_record(record) else {
            return StageOutcome::Unchanged("no local file to replicate".to_string());
        };
        let request = request.with_local_path(resolved);

        match self.target.replicate(&request).await {
            Ok(true) => {
                let mut flags = record.replica_flags().clone();
                flags.insert(self.destination());
                let Some(target) = self.policy.stage_for(&flags) else {
                    return StageOutcome::Unchanged("replica flags not recognised".to_string());
                };
                info!(%target, "Replica confirmed");
                StageOutcome::Advanced(Mutation::advance_to(target).with_replica(self.destination()))
            }
            Ok(false) => {
                debug!("Replica not yet confirmed");
                StageOutcome::Unchanged(format!(
                    "{} has not confirmed the copy",
                    self.destination()
                ))
            }
            Err(e) => StageOutcome::Failed(e),
        }
    }
}
