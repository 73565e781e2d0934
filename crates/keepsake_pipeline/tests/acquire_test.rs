use async_trait::async_trait;
use chrono::Utc;
use keepsake_core::{AcquiredAttrs, ReplicaPolicy, UpsertResult};
use keepsake_error::KeepsakeResult;
use keepsake_interface::{LedgerStore, SourceService};
use keepsake_pipeline::{AcquireExecutor, AcquireOutcome, InMemoryLedger};
use keepsake_storage::LocalMediaStore;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Source whose download finishes after another worker has already
/// recorded the same reference with the file at `winner_path`.
struct RacingSource {
    ledger: Arc<InMemoryLedger>,
    download_path: PathBuf,
    winner_path: PathBuf,
}

#[async_trait]
impl SourceService for RacingSource {
    async fn list_candidates(&self, _: usize) -> KeepsakeResult<Vec<String>> {
        Ok(vec!["IMG_0001".to_string()])
    }

    async fn acquire(&self, source_reference: &str) -> KeepsakeResult<AcquiredAttrs> {
        tokio::fs::write(&self.download_path, b"ours").await.unwrap();
        let winner = AcquiredAttrs::new(&self.winner_path, 6, Utc::now());
        let recorded = self
            .ledger
            .record_acquisition(source_reference, &winner)
            .await
            .unwrap();
        assert!(recorded.is_created());
        Ok(AcquiredAttrs::new(&self.download_path, 4, Utc::now()))
    }
}

fn racing(dir: &TempDir, download: &str, winner: &str) -> (AcquireExecutor, Arc<InMemoryLedger>) {
    let ledger = Arc::new(InMemoryLedger::new(ReplicaPolicy::new("nas", "pixel")));
    let source = Arc::new(RacingSource {
        ledger: Arc::clone(&ledger),
        download_path: dir.path().join(download),
        winner_path: dir.path().join(winner),
    });
    let store = LocalMediaStore::new(dir.path()).unwrap();
    let executor = AcquireExecutor::new(source, ledger.clone(), store);
    (executor, ledger)
}

#[tokio::test]
async fn losing_a_race_removes_the_duplicate_download() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("winner.jpg"), b"theirs").unwrap();
    let (executor, ledger) = racing(&dir, "ours.jpg", "winner.jpg");

    let outcome = executor.acquire("IMG_0001").await.unwrap();

    let AcquireOutcome::AlreadyKnown(record) = outcome else {
        panic!("expected AlreadyKnown, got {:?}", outcome);
    };
    assert_eq!(
        record.local_path().as_deref(),
        Some(dir.path().join("winner.jpg").as_path())
    );
    assert!(!dir.path().join("ours.jpg").exists());
    assert!(dir.path().join("winner.jpg").exists());
    assert_eq!(ledger.len().await, 1);
}

#[tokio::test]
async fn losing_a_race_to_the_same_path_keeps_the_file() {
    let dir = TempDir::new().unwrap();
    let (executor, ledger) = racing(&dir, "IMG_0001.jpg", "IMG_0001.jpg");

    let outcome = executor.acquire("IMG_0001").await.unwrap();

    assert!(matches!(outcome, AcquireOutcome::AlreadyKnown(_)));
    assert!(dir.path().join("IMG_0001.jpg").exists());
    assert_eq!(ledger.len().await, 1);
}

#[tokio::test]
async fn recording_twice_reports_created_once() {
    let ledger = InMemoryLedger::new(ReplicaPolicy::new("nas", "pixel"));
    let attrs = AcquiredAttrs::new("/media/a.jpg", 10, Utc::now());

    let first = ledger.record_acquisition("a", &attrs).await.unwrap();
    let second = ledger.record_acquisition("a", &attrs).await.unwrap();

    assert!(first.is_created());
    assert!(matches!(&second, UpsertResult::Existing(r) if r == first.record()));
}
