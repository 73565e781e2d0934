//! Process-local `LedgerStore`.

use async_trait::async_trait;
use chrono::Utc;
use keepsake_core::{
    AcquiredAttrs, EligibilityQuery, Failure, LedgerStats, MediaRecord, Mutation, PassReport,
    PassRun, ReplicaPolicy, Stage, TransitionResult, UpsertResult,
};
use keepsake_error::{DatabaseError, DatabaseErrorKind, KeepsakeResult};
use keepsake_interface::LedgerStore;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

#[derive(Debug, Default)]
struct State {
    records: HashMap<String, MediaRecord>,
    by_source: HashMap<String, String>,
    passes: Vec<PassRun>,
}

/// Ledger kept in memory behind a tokio `RwLock`.
///
/// Applies the same [`MediaRecord::transition`] rules as the SQLite ledger.
/// Every operation holds the lock for its whole read-modify-write, which
/// gives the same compare-and-swap behavior within one process. Nothing
/// survives a restart.
#[derive(Debug)]
pub struct InMemoryLedger {
    policy: ReplicaPolicy,
    state: RwLock<State>,
}

impl InMemoryLedger {
    /// Create an empty ledger enforcing `policy`.
    pub fn new(policy: ReplicaPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(State::default()),
        }
    }

    /// Replica policy enforced on transitions.
    pub fn policy(&self) -> &ReplicaPolicy {
        &self.policy
    }

    /// Insert or replace a record as-is, bypassing transition rules.
    ///
    /// For importing existing state.
    pub async fn insert(&self, record: MediaRecord) {
        let mut state = self.state.write().await;
        state
            .by_source
            .insert(record.source_reference().clone(), record.id().clone());
        state.records.insert(record.id().clone(), record);
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Whether the ledger holds no records.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }
}

fn not_found(id: &str) -> DatabaseError {
    DatabaseError::new(DatabaseErrorKind::NotFound(format!("media record {}", id)))
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    #[instrument(skip(self, attrs))]
    async fn record_acquisition(
        &self,
        source_reference: &str,
        attrs: &AcquiredAttrs,
    ) -> KeepsakeResult<UpsertResult> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .by_source
            .get(source_reference)
            .and_then(|id| state.records.get(id))
        {
            debug!(record_id = %existing.id(), "Source reference already acquired");
            return Ok(UpsertResult::Existing(existing.clone()));
        }

        let record = MediaRecord::acquired(
            uuid::Uuid::new_v4().to_string(),
            source_reference,
            attrs,
            Utc::now(),
        );
        state
            .by_source
            .insert(source_reference.to_string(), record.id().clone());
        state.records.insert(record.id().clone(), record.clone());
        Ok(UpsertResult::Created(record))
    }

    async fn get(&self, id: &str) -> KeepsakeResult<Option<MediaRecord>> {
        Ok(self.state.read().await.records.get(id).cloned())
    }

    async fn find_by_source_reference(
        &self,
        source_reference: &str,
    ) -> KeepsakeResult<Option<MediaRecord>> {
        let state = self.state.read().await;
        Ok(state
            .by_source
            .get(source_reference)
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn find_eligible(&self, query: &EligibilityQuery) -> KeepsakeResult<Vec<MediaRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<MediaRecord> = state
            .records
            .values()
            .filter(|r| r.matches(query))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.updated_at()
                .cmp(b.updated_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        records.truncate(*query.limit());
        Ok(records)
    }

    #[instrument(skip(self, mutation), fields(target = %mutation.target()))]
    async fn apply_transition(
        &self,
        id: &str,
        expected_stage: Stage,
        mutation: &Mutation,
    ) -> KeepsakeResult<TransitionResult> {
        let mut state = self.state.write().await;
        let current = state.records.get(id).ok_or_else(|| not_found(id))?;
        if *current.stage() != expected_stage {
            debug!(current_stage = %current.stage(), "Transition conflict");
            return Ok(TransitionResult::Conflict {
                current_stage: *current.stage(),
            });
        }

        let next = current
            .transition(mutation, &self.policy, Utc::now())
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::InvalidTransition(e.to_string())))?;
        state.records.insert(id.to_string(), next.clone());
        Ok(TransitionResult::Applied(next))
    }

    #[instrument(skip(self, failure), fields(class = %failure.class()))]
    async fn record_failure(
        &self,
        id: &str,
        failure: &Failure,
        max_failures: u32,
    ) -> KeepsakeResult<MediaRecord> {
        let mut state = self.state.write().await;
        let current = state.records.get(id).ok_or_else(|| not_found(id))?;
        let next = current.with_failure(failure, max_failures, Utc::now());
        if *next.quarantined() && !current.quarantined() {
            warn!(record_id = %id, error_count = next.error_count(), "Record quarantined");
        }
        state.records.insert(id.to_string(), next.clone());
        Ok(next)
    }

    async fn clear_quarantine(&self, id: &str) -> KeepsakeResult<bool> {
        let mut state = self.state.write().await;
        let current = state.records.get(id).ok_or_else(|| not_found(id))?;
        if !current.quarantined() {
            return Ok(false);
        }
        let released = current.released(Utc::now());
        state.records.insert(id.to_string(), released);
        Ok(true)
    }

    async fn list_quarantined(&self, limit: usize) -> KeepsakeResult<Vec<MediaRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<MediaRecord> = state
            .records
            .values()
            .filter(|r| *r.quarantined())
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at().cmp(a.updated_at()));
        records.truncate(limit);
        Ok(records)
    }

    async fn stats(&self) -> KeepsakeResult<LedgerStats> {
        let state = self.state.read().await;
        let mut stats = LedgerStats::empty();
        for record in state.records.values() {
            stats.total += 1;
            if *record.quarantined() {
                stats.quarantined += 1;
            }
            *stats.by_stage.entry(*record.stage()).or_insert(0) += 1;
            stats.bytes_original += record.byte_size_original();
            stats.bytes_current += record.byte_size_current();
        }
        Ok(stats)
    }

    async fn record_pass(&self, report: &PassReport) -> KeepsakeResult<i64> {
        let mut state = self.state.write().await;
        let id = i64::try_from(state.passes.len()).unwrap_or(i64::MAX - 1) + 1;
        state.passes.push(PassRun::new(id, report.clone()));
        Ok(id)
    }

    async fn recent_passes(&self, limit: usize) -> KeepsakeResult<Vec<PassRun>> {
        let state = self.state.read().await;
        Ok(state.passes.iter().rev().take(limit).cloned().collect())
    }
}
