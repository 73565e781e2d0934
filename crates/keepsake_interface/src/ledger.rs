//! The durable record store.

use async_trait::async_trait;
use keepsake_core::{
    AcquiredAttrs, EligibilityQuery, Failure, LedgerStats, MediaRecord, Mutation, PassReport,
    PassRun, Stage, TransitionResult, UpsertResult,
};
use keepsake_error::KeepsakeResult;

/// Durable, crash-safe storage of media records.
///
/// Every mutation is a single-record transaction. [`apply_transition`] is
/// the only way a record's stage changes, and it is a compare-and-swap on
/// the stage: two callers racing with the same `expected_stage` see exactly
/// one `Applied` and one `Conflict`.
///
/// [`apply_transition`]: LedgerStore::apply_transition
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create a record for `source_reference`, or return the existing one unchanged.
    ///
    /// The check and the insert are one transaction, so of several callers
    /// racing on the same reference exactly one sees `Created`.
    async fn record_acquisition(
        &self,
        source_reference: &str,
        attrs: &AcquiredAttrs,
    ) -> KeepsakeResult<UpsertResult>;

    /// [`record_acquisition`](LedgerStore::record_acquisition) without the outcome.
    async fn upsert_on_acquire(
        &self,
        source_reference: &str,
        attrs: &AcquiredAttrs,
    ) -> KeepsakeResult<MediaRecord> {
        Ok(self
            .record_acquisition(source_reference, attrs)
            .await?
            .into_record())
    }

    /// Load a record by id.
    async fn get(&self, id: &str) -> KeepsakeResult<Option<MediaRecord>>;

    /// Load a record by its origin identifier.
    async fn find_by_source_reference(
        &self,
        source_reference: &str,
    ) -> KeepsakeResult<Option<MediaRecord>>;

    /// Snapshot of non-quarantined records matching `query`, oldest-updated first.
    async fn find_eligible(&self, query: &EligibilityQuery) -> KeepsakeResult<Vec<MediaRecord>>;

    /// Apply `mutation` if the record is still at `expected_stage`.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` for an unknown id and `InvalidTransition` when
    /// the mutation breaks a lifecycle invariant.
    async fn apply_transition(
        &self,
        id: &str,
        expected_stage: Stage,
        mutation: &Mutation,
    ) -> KeepsakeResult<TransitionResult>;

    /// Count a failed attempt, quarantining the record when the failure is
    /// permanent or the count reaches `max_failures`. Never changes the stage.
    async fn record_failure(
        &self,
        id: &str,
        failure: &Failure,
        max_failures: u32,
    ) -> KeepsakeResult<MediaRecord>;

    /// Release a record from quarantine. Returns false if it was not quarantined.
    async fn clear_quarantine(&self, id: &str) -> KeepsakeResult<bool>;

    /// Quarantined records, most recently updated first.
    async fn list_quarantined(&self, limit: usize) -> KeepsakeResult<Vec<MediaRecord>>;

    /// Ledger-wide counts.
    async fn stats(&self) -> KeepsakeResult<LedgerStats>;

    /// Journal a finished pass and return its journal id.
    async fn record_pass(&self, report: &PassReport) -> KeepsakeResult<i64>;

    /// Most recent journaled passes, newest first.
    async fn recent_passes(&self, limit: usize) -> KeepsakeResult<Vec<PassRun>>;
}
