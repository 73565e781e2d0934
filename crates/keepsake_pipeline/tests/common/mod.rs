#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use keepsake_core::{AcquiredAttrs, CompressionTier, LifecycleEvent, MediaRecord};
use keepsake_error::{CollaboratorError, CollaboratorErrorKind, KeepsakeResult};
use keepsake_interface::{
    CompressedMedia, Compressor, DeletionService, LedgerStore, Notifier, ReplicationRequest,
    ReplicationTarget, SourceService,
};
use keepsake_pipeline::{
    ChannelNotifier, InMemoryLedger, LimitsConfig, Notification, Orchestrator, PipelineConfig,
};
use keepsake_storage::LocalMediaStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub const NAS: &str = "nas";
pub const PIXEL: &str = "pixel";

/// Source that "downloads" by writing a file of the configured size.
pub struct MockSource {
    dir: PathBuf,
    assets: Mutex<Vec<(String, u64, DateTime<Utc>)>>,
    missing: Mutex<Vec<String>>,
    pub acquire_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl MockSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            assets: Mutex::new(Vec::new()),
            missing: Mutex::new(Vec::new()),
            acquire_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn add(&self, reference: &str, byte_size: u64, created_at: DateTime<Utc>) {
        self.assets
            .lock()
            .unwrap()
            .push((reference.to_string(), byte_size, created_at));
    }

    /// Listed but gone at the source.
    pub fn add_missing(&self, reference: &str) {
        self.missing.lock().unwrap().push(reference.to_string());
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceService for MockSource {
    async fn list_candidates(&self, limit: usize) -> KeepsakeResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut refs: Vec<String> = self
            .assets
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _, _)| r.clone())
            .collect();
        refs.extend(self.missing.lock().unwrap().iter().cloned());
        refs.truncate(limit);
        Ok(refs)
    }

    async fn acquire(&self, source_reference: &str) -> KeepsakeResult<AcquiredAttrs> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        let asset = self
            .assets
            .lock()
            .unwrap()
            .iter()
            .find(|(r, _, _)| r == source_reference)
            .cloned();
        let Some((reference, byte_size, created_at)) = asset else {
            return Err(CollaboratorError::new(CollaboratorErrorKind::NotFound(
                source_reference.to_string(),
            ))
            .into());
        };
        let path = self.dir.join(format!("{}.jpg", reference));
        tokio::fs::write(&path, vec![0xAB; byte_size as usize])
            .await
            .unwrap();
        Ok(AcquiredAttrs::new(path, byte_size, created_at))
    }
}

/// How a mock replication target answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    Confirm,
    Pending,
    Transient,
    Hang,
    Panic,
}

pub struct MockTarget {
    id: String,
    mode: Mutex<TargetMode>,
    pub calls: AtomicUsize,
    pub copies: Mutex<HashMap<String, u64>>,
}

impl MockTarget {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            mode: Mutex::new(TargetMode::Confirm),
            calls: AtomicUsize::new(0),
            copies: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_mode(&self, mode: TargetMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn holds(&self, record_id: &str) -> bool {
        self.copies.lock().unwrap().contains_key(record_id)
    }
}

#[async_trait]
impl ReplicationTarget for MockTarget {
    fn destination_id(&self) -> &str {
        &self.id
    }

    async fn replicate(&self, request: &ReplicationRequest) -> KeepsakeResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();
        match mode {
            TargetMode::Confirm => {
                self.copies
                    .lock()
                    .unwrap()
                    .insert(request.record_id().clone(), *request.byte_size());
                Ok(true)
            }
            TargetMode::Pending => Ok(false),
            TargetMode::Transient => Err(CollaboratorError::new(
                CollaboratorErrorKind::Transient("share offline".to_string()),
            )
            .into()),
            TargetMode::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(true)
            }
            TargetMode::Panic => panic!("replication target exploded"),
        }
    }
}

/// Halves the file in place.
pub struct MockCompressor {
    pub tiers: Mutex<Vec<CompressionTier>>,
}

impl MockCompressor {
    pub fn new() -> Self {
        Self {
            tiers: Mutex::new(Vec::new()),
        }
    }

    pub fn tiers(&self) -> Vec<CompressionTier> {
        self.tiers.lock().unwrap().clone()
    }
}

#[async_trait]
impl Compressor for MockCompressor {
    async fn compress(
        &self,
        local_path: &Path,
        tier: CompressionTier,
    ) -> KeepsakeResult<CompressedMedia> {
        self.tiers.lock().unwrap().push(tier);
        let bytes = tokio::fs::read(local_path).await.unwrap();
        let half = bytes.len() / 2;
        tokio::fs::write(local_path, &bytes[..half]).await.unwrap();
        Ok(CompressedMedia::new(local_path, half as u64))
    }
}

pub struct MockDeletion {
    confirm: Mutex<bool>,
    pub staged: Mutex<Vec<String>>,
    pub confirmed: Mutex<Vec<String>>,
}

impl MockDeletion {
    pub fn new() -> Self {
        Self {
            confirm: Mutex::new(true),
            staged: Mutex::new(Vec::new()),
            confirmed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_confirm(&self, confirm: bool) {
        *self.confirm.lock().unwrap() = confirm;
    }

    pub fn staged(&self) -> Vec<String> {
        self.staged.lock().unwrap().clone()
    }

    pub fn confirmed(&self) -> Vec<String> {
        self.confirmed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeletionService for MockDeletion {
    async fn stage_for_deletion(&self, source_reference: &str) -> KeepsakeResult<String> {
        self.staged.lock().unwrap().push(source_reference.to_string());
        Ok(format!("token-{}", source_reference))
    }

    async fn confirm_deletion(&self, token: &str) -> KeepsakeResult<bool> {
        let confirm = *self.confirm.lock().unwrap();
        if confirm {
            self.confirmed.lock().unwrap().push(token.to_string());
        }
        Ok(confirm)
    }
}

pub struct PanickingNotifier;

impl Notifier for PanickingNotifier {
    fn notify(&self, _event: &LifecycleEvent) {
        panic!("notifier down");
    }
}

pub fn months_ago(months: u32) -> DateTime<Utc> {
    Utc::now().checked_sub_months(Months::new(months)).unwrap()
}

/// Everything a pipeline test needs, wired around an in-memory ledger.
pub struct Harness {
    pub dir: TempDir,
    pub ledger: Arc<InMemoryLedger>,
    pub source: Arc<MockSource>,
    pub nas: Arc<MockTarget>,
    pub pixel: Arc<MockTarget>,
    pub compressor: Arc<MockCompressor>,
    pub deletion: Arc<MockDeletion>,
    pub events: UnboundedReceiver<Notification>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limits(LimitsConfig::default())
    }

    pub fn with_limits(limits: LimitsConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::new(dir.path().join("ledger.db"), NAS, PIXEL)
            .with_limits(limits)
            .with_media_root(dir.path().join("media"));
        let ledger = Arc::new(InMemoryLedger::new(config.replica_policy()));
        Self::assemble(dir, config, ledger)
    }

    pub fn assemble(dir: TempDir, config: PipelineConfig, ledger: Arc<InMemoryLedger>) -> Self {
        let source = Arc::new(MockSource::new(dir.path()));
        let nas = Arc::new(MockTarget::new(NAS));
        let pixel = Arc::new(MockTarget::new(PIXEL));
        let compressor = Arc::new(MockCompressor::new());
        let deletion = Arc::new(MockDeletion::new());
        let (notifier, events) = ChannelNotifier::channel();
        let store = LocalMediaStore::new(config.storage().media_root()).unwrap();

        let orchestrator = Orchestrator::builder()
            .config(config)
            .ledger(ledger.clone() as Arc<dyn LedgerStore>)
            .source(source.clone())
            .replica_a(nas.clone())
            .replica_b(pixel.clone())
            .compressor(compressor.clone())
            .deletion(deletion.clone())
            .notifier(Arc::new(notifier))
            .local_store(store)
            .build()
            .unwrap();

        Self {
            dir,
            ledger,
            source,
            nas,
            pixel,
            compressor,
            deletion,
            events,
            orchestrator,
        }
    }

    pub async fn record(&self, source_reference: &str) -> MediaRecord {
        self.ledger
            .find_by_source_reference(source_reference)
            .await
            .unwrap()
            .unwrap()
    }

    pub fn drain_events(&mut self) -> Vec<Notification> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
