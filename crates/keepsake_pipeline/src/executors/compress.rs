//! Compresses locally held files once both replicas are confirmed.

use crate::{StageExecutor, StageOutcome};
use async_trait::async_trait;
use chrono::Utc;
use keepsake_core::{CompressionTier, MediaRecord, Mutation, PipelineStage, Stage, TierBoundaries};
use keepsake_error::{StorageError, StorageErrorKind};
use keepsake_interface::Compressor;
use keepsake_storage::LocalMediaStore;
use std::sync::Arc;
use tracing::{info, instrument};

/// The compress step.
///
/// Accepts only `ReplicatedBoth`, so a record is compressed at most once no
/// matter what its sizes say. The tier follows the content's age.
#[derive(Clone)]
pub struct CompressExecutor {
    compressor: Arc<dyn Compressor>,
    boundaries: TierBoundaries,
    store: LocalMediaStore,
}

impl std::fmt::Debug for CompressExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressExecutor")
            .field("boundaries", &self.boundaries)
            .finish_non_exhaustive()
    }
}

impl CompressExecutor {
    /// Create the step.
    pub fn new(
        compressor: Arc<dyn Compressor>,
        boundaries: TierBoundaries,
        store: LocalMediaStore,
    ) -> Self {
        Self {
            compressor,
            boundaries,
            store,
        }
    }

    /// Tier applied to `record` today.
    pub fn tier_for(&self, record: &MediaRecord) -> CompressionTier {
        CompressionTier::for_age(*record.created_at(), Utc::now(), &self.boundaries)
    }
}

#[async_trait]
impl StageExecutor for CompressExecutor {
    fn pipeline_stage(&self) -> PipelineStage {
        PipelineStage::Compress
    }

    #[instrument(skip_all, fields(record_id = %record.id()))]
    async fn execute(&self, record: &MediaRecord) -> StageOutcome {
        if *record.stage() != Stage::ReplicatedBoth {
            return StageOutcome::Unchanged(format!("record is at {}", record.stage()));
        }
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

        let tier = self.tier_for(record);
        match self.compressor.compress(&resolved, tier).await {
            Ok(media) => {
                info!(
                    %tier,
                    original = record.byte_size_current(),
                    compressed = media.byte_size(),
                    "Compressed"
                );
                let mut mutation = Mutation::advance_to(Stage::Compressed)
                    .with_compression_tier(tier)
                    .with_byte_size_current(*media.byte_size());
                if media.local_path() != &resolved {
                    mutation = mutation.with_local_path(media.local_path().clone());
                }
                StageOutcome::Advanced(mutation)
            }
            Err(e) => StageOutcome::Failed(e),
        }
    }
}
