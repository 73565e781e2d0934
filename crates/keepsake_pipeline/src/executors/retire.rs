//! Two-phase deletion of originals at the source.

use crate::{StageExecutor, StageOutcome};
use async_trait::async_trait;
use keepsake_core::{MediaRecord, Mutation, PipelineStage, ReplicaPolicy, Stage};
use keepsake_error::{
    CollaboratorError, CollaboratorErrorKind, DatabaseError, DatabaseErrorKind,
};
use keepsake_interface::DeletionService;
use keepsake_storage::LocalMediaStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The retire step.
///
/// Runs exactly one phase per call:
///
/// - at `Compressed`, with both replicas confirmed, stage the source
///   deletion and keep the returned token (`RetirementStaged`)
/// - at `RetirementStaged`, confirm the deletion; only an explicit `true`
///   releases the local file and retires the record
///
/// A refused confirmation is a transient failure, so the record stays at
/// `RetirementStaged` and counts toward quarantine.
#[derive(Clone)]
pub struct RetireExecutor {
    deletion: Arc<dyn DeletionService>,
    policy: ReplicaPolicy,
    store: LocalMediaStore,
}

impl std::fmt::Debug for RetireExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetireExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetireExecutor {
    /// Create the step.
    pub fn new(
        deletion: Arc<dyn DeletionService>,
        policy: ReplicaPolicy,
        store: LocalMediaStore,
    ) -> Self {
        Self {
            deletion,
            policy,
            store,
        }
    }

    async fn stage_deletion(&self, record: &MediaRecord) -> StageOutcome {
        if !self.policy.is_satisfied_by(record.replica_flags()) {
            return StageOutcome::Unchanged(format!(
                "waiting for replicas (have [{}])",
                record.replica_flags().to_column()
            ));
        }
        match self.deletion.stage_for_deletion(record.source_reference()).await {
            Ok(token) => {
                info!("Source deletion staged");
                StageOutcome::Advanced(
                    Mutation::advance_to(Stage::RetirementStaged).with_deletion_token(token),
                )
            }
            Err(e) => StageOutcome::Failed(e),
        }
    }

    async fn confirm_deletion(&self, record: &MediaRecord) -> StageOutcome {
        let Some(token) = record.deletion_token() else {
            return StageOutcome::failed(DatabaseError::new(DatabaseErrorKind::CorruptRow(
                format!("record {} is retirement_staged without a token", record.id()),
            )));
        };
        match self.deletion.confirm_deletion(token).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Source refused to confirm deletion");
                return StageOutcome::failed(CollaboratorError::new(
                    CollaboratorErrorKind::Rejected(format!(
                        "deletion of {} not confirmed",
                        record.source_reference()
                    )),
                ));
            }
            Err(e) => return StageOutcome::Failed(e),
        }

        if let Some(local_path) = record.local_path() {
            match self.store.release(local_path).await {
                Ok(true) => {}
                Ok(false) => debug!("Local file was already gone"),
                Err(e) => return StageOutcome::Failed(e),
            }
        }
        info!("Retired");
        StageOutcome::Advanced(Mutation::advance_to(Stage::Retired))
    }
}

#[async_trait]
impl StageExecutor for RetireExecutor {
    fn pipeline_stage(&self) -> PipelineStage {
        PipelineStage::Retire
    }

    #[instrument(skip_all, fields(record_id = %record.id(), stage = %record.stage()))]
    async fn execute(&self, record: &MediaRecord) -> StageOutcome {
        match record.stage() {
            Stage::Compressed => self.stage_deletion(record).await,
            Stage::RetirementStaged => self.confirm_deletion(record).await,
            other => StageOutcome::Unchanged(format!("record is at {}", other)),
        }
    }
}
