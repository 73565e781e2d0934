mod common;

use async_trait::async_trait;
use common::{MockCompressor, MockDeletion, MockSource, MockTarget, NAS, PIXEL, months_ago};
use keepsake_core::{
    AcquiredAttrs, EligibilityQuery, Failure, LedgerStats, MediaRecord, Mutation, PassReport,
    PassRun, PipelineStage, Stage, TransitionResult, UpsertResult,
};
use keepsake_database::SqliteLedger;
use keepsake_error::{DatabaseError, DatabaseErrorKind, KeepsakeResult};
use keepsake_interface::LedgerStore;
use keepsake_pipeline::{Orchestrator, PipelineConfig};
use std::sync::Arc;
use tempfile::TempDir;

fn sqlite_orchestrator(
    dir: &TempDir,
    ledger: Arc<dyn LedgerStore>,
) -> (Orchestrator, Arc<MockSource>, Arc<MockDeletion>) {
    let config = PipelineConfig::new(dir.path().join("ledger.db"), NAS, PIXEL)
        .with_media_root(dir.path().join("media"));
    let source = Arc::new(MockSource::new(dir.path()));
    let deletion = Arc::new(MockDeletion::new());
    let orchestrator = Orchestrator::builder()
        .config(config)
        .ledger(ledger)
        .source(source.clone())
        .replica_a(Arc::new(MockTarget::new(NAS)))
        .replica_b(Arc::new(MockTarget::new(PIXEL)))
        .compressor(Arc::new(MockCompressor::new()))
        .deletion(deletion.clone())
        .build()
        .unwrap();
    (orchestrator, source, deletion)
}

#[tokio::test]
async fn lifecycle_survives_restart_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ledger.db");
    let policy = PipelineConfig::new(&db, NAS, PIXEL).replica_policy();

    {
        let ledger = Arc::new(SqliteLedger::open(&db, 2, policy.clone()).unwrap());
        let (orchestrator, source, _) = sqlite_orchestrator(&dir, ledger);
        source.add("photo123", 1_000, months_ago(6));
        let report = orchestrator.run_pass().await.unwrap();
        assert_eq!(report.total_advanced(), 5);
    }

    let ledger = Arc::new(SqliteLedger::open(&db, 2, policy).unwrap());
    let (orchestrator, source, deletion) = sqlite_orchestrator(&dir, ledger.clone());
    source.add("photo123", 1_000, months_ago(6));
    orchestrator.run_pass().await.unwrap();

    let record = ledger
        .find_by_source_reference("photo123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.stage(), &Stage::Retired);
    assert!(record.local_path().is_none());
    assert_eq!(deletion.confirmed(), vec!["token-photo123".to_string()]);
    assert_eq!(source.acquire_calls(), 0);

    let passes = ledger.recent_passes(10).await.unwrap();
    assert_eq!(passes.len(), 2);
    assert!(passes[0].id() > passes[1].id());
}

/// Ledger whose reads fail as if the database were gone.
struct UnavailableLedger;

fn unavailable() -> DatabaseError {
    DatabaseError::new(DatabaseErrorKind::Connection("database is locked".to_string()))
}

#[async_trait]
impl LedgerStore for UnavailableLedger {
    async fn record_acquisition(
        &self,
        _: &str,
        _: &AcquiredAttrs,
    ) -> KeepsakeResult<UpsertResult> {
        Err(unavailable().into())
    }
    async fn get(&self, _: &str) -> KeepsakeResult<Option<MediaRecord>> {
        Err(unavailable().into())
    }
    async fn find_by_source_reference(&self, _: &str) -> KeepsakeResult<Option<MediaRecord>> {
        Err(unavailable().into())
    }
    async fn find_eligible(&self, _: &EligibilityQuery) -> KeepsakeResult<Vec<MediaRecord>> {
        Err(unavailable().into())
    }
    async fn apply_transition(
        &self,
        _: &str,
        _: Stage,
        _: &Mutation,
    ) -> KeepsakeResult<TransitionResult> {
        Err(unavailable().into())
    }
    async fn record_failure(&self, _: &str, _: &Failure, _: u32) -> KeepsakeResult<MediaRecord> {
        Err(unavailable().into())
    }
    async fn clear_quarantine(&self, _: &str) -> KeepsakeResult<bool> {
        Err(unavailable().into())
    }
    async fn list_quarantined(&self, _: usize) -> KeepsakeResult<Vec<MediaRecord>> {
        Err(unavailable().into())
    }
    async fn stats(&self) -> KeepsakeResult<LedgerStats> {
        Err(unavailable().into())
    }
    async fn record_pass(&self, _: &PassReport) -> KeepsakeResult<i64> {
        Err(unavailable().into())
    }
    async fn recent_passes(&self, _: usize) -> KeepsakeResult<Vec<PassRun>> {
        Err(unavailable().into())
    }
}

#[tokio::test]
async fn unavailable_ledger_aborts_the_pass() {
    let dir = TempDir::new().unwrap();
    let (orchestrator, source, _) = sqlite_orchestrator(&dir, Arc::new(UnavailableLedger));
    source.add("photo", 10, months_ago(1));

    let err = orchestrator.run_pass().await.unwrap_err();
    assert!(err.is_fatal());

    let err = orchestrator
        .run_stage(PipelineStage::Compress)
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}
