//! The contract every record-driven pipeline step implements.

use async_trait::async_trait;
use keepsake_core::{EligibilityQuery, MediaRecord, Mutation, PipelineStage};
use keepsake_error::KeepsakeError;

/// Result of running one executor against one record.
///
/// Executors never write to the ledger. The orchestrator applies an
/// `Advanced` mutation with a compare-and-swap and records `Failed` errors.
#[derive(Debug, derive_more::Display)]
pub enum StageOutcome {
    /// Move the record forward with this mutation
    #[display("advanced to {}", _0.target())]
    Advanced(Mutation),
    /// Preconditions are not met yet; try again on a later pass
    #[display("unchanged: {}", _0)]
    Unchanged(String),
    /// The attempt failed
    #[display("failed: {}", _0)]
    Failed(KeepsakeError),
}

impl StageOutcome {
    /// Shorthand for a failed outcome.
    pub fn failed(error: impl Into<KeepsakeError>) -> Self {
        StageOutcome::Failed(error.into())
    }
}

/// A pipeline step driven by ledger eligibility.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Step this executor implements.
    fn pipeline_stage(&self) -> PipelineStage;

    /// Records this step accepts, at most `limit` of them.
    fn query(&self, limit: usize) -> EligibilityQuery {
        EligibilityQuery::new(self.pipeline_stage().entry_stages(), limit)
    }

    /// Run the step against one record.
    async fn execute(&self, record: &MediaRecord) -> StageOutcome;
}
