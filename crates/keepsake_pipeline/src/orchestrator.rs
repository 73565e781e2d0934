//! Runs pipeline passes against the ledger.

use crate::{
    AcquireExecutor, AcquireOutcome, CompressExecutor, PipelineConfig, ReplicateExecutor,
    RetireExecutor, StageExecutor, StageOutcome, TracingNotifier,
};
use chrono::Utc;
use futures::{FutureExt, StreamExt, stream};
use keepsake_core::{
    EventKind, Failure, LifecycleEvent, MediaRecord, PassReport, PipelineStage, ReplicaSlot,
    StageReport, TransitionResult,
};
use keepsake_error::{
    CollaboratorError, CollaboratorErrorKind, KeepsakeError, KeepsakeResult, PipelineError,
    PipelineErrorKind,
};
use keepsake_interface::{
    Compressor, DeletionService, LedgerStore, Notifier, ReplicationTarget, SourceService,
};
use keepsake_storage::{FfmpegCompressor, LocalMediaStore};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// How one record fared within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Advanced,
    Unchanged,
    Conflict,
    Failed { quarantined: bool },
}

impl RecordOutcome {
    fn tally(self, report: &mut StageReport) {
        match self {
            RecordOutcome::Advanced => report.advanced += 1,
            RecordOutcome::Unchanged => report.unchanged += 1,
            RecordOutcome::Conflict => report.conflicts += 1,
            RecordOutcome::Failed { quarantined } => {
                report.failed += 1;
                if quarantined {
                    report.quarantined += 1;
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Drives records through the lifecycle one pass at a time.
///
/// The orchestrator owns no schedule. Callers invoke [`run_pass`] from a
/// timer, a cron job or on demand; several orchestrators may share one
/// ledger, and the ledger's compare-and-swap keeps them from applying the
/// same step twice.
///
/// Within a pass the steps run in order (acquire, replicate A, replicate B,
/// compress, retire). Each step loads one batch of eligible records and
/// works through it with bounded parallelism. Every executor call is
/// bounded by the configured timeout and isolated from panics. Only a fatal
/// ledger error stops the pass early.
///
/// [`run_pass`]: Orchestrator::run_pass
pub struct Orchestrator {
    config: PipelineConfig,
    ledger: Arc<dyn LedgerStore>,
    acquire: AcquireExecutor,
    replicate_a: Arc<dyn StageExecutor>,
    replicate_b: Arc<dyn StageExecutor>,
    compress: Arc<dyn StageExecutor>,
    retire: Arc<dyn StageExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates a new orchestrator builder.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ledger passes run against.
    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    /// Run every step once, honoring the configured dry-run flag.
    ///
    /// The report is journaled and handed to the notifier, including for
    /// aborted passes.
    ///
    /// # Errors
    ///
    /// Returns the fatal ledger error that aborted the pass.
    pub async fn run_pass(&self) -> KeepsakeResult<PassReport> {
        self.execute_pass(*self.config.dry_run()).await
    }

    /// Run every step once without calling collaborators or changing records.
    ///
    /// # Errors
    ///
    /// Returns the fatal ledger error that aborted the pass.
    pub async fn run_pass_dry(&self) -> KeepsakeResult<PassReport> {
        self.execute_pass(true).await
    }

    /// Run a single step, honoring the configured dry-run flag.
    ///
    /// Single steps are not journaled.
    ///
    /// # Errors
    ///
    /// Returns a fatal ledger error.
    pub async fn run_stage(&self, stage: PipelineStage) -> KeepsakeResult<StageReport> {
        self.execute_stage(stage, *self.config.dry_run()).await
    }

    #[instrument(skip(self))]
    async fn execute_pass(&self, dry_run: bool) -> KeepsakeResult<PassReport> {
        let mut report = PassReport::started(Utc::now(), dry_run);
        info!("Starting pass");

        let mut fatal = None;
        for stage in PipelineStage::in_order() {
            match self.execute_stage(stage, dry_run).await {
                Ok(stage_report) => report.push(stage_report),
                Err(e) => {
                    error!(%stage, error = %e, "Ledger unavailable, aborting pass");
                    report.aborted = Some(format!("{}: {}", stage, e));
                    fatal = Some(e);
                    break;
                }
            }
        }
        report.finished_at = Some(Utc::now());

        match self.ledger.record_pass(&report).await {
            Ok(pass_id) => debug!(pass_id, "Journaled pass"),
            Err(e) => warn!(error = %e, "Could not journal pass"),
        }
        if std::panic::catch_unwind(AssertUnwindSafe(|| self.notifier.pass_completed(&report)))
            .is_err()
        {
            warn!("Notifier panicked on pass completion");
        }

        info!(
            advanced = report.total_advanced(),
            failed = report.total_failed(),
            "Pass finished"
        );
        match fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Returns `Err` only for fatal ledger errors.
    async fn execute_stage(
        &self,
        stage: PipelineStage,
        dry_run: bool,
    ) -> KeepsakeResult<StageReport> {
        let executor = match stage {
            PipelineStage::Acquire => return self.run_acquire(dry_run).await,
            PipelineStage::ReplicateA => &self.replicate_a,
            PipelineStage::ReplicateB => &self.replicate_b,
            PipelineStage::Compress => &self.compress,
            PipelineStage::Retire => &self.retire,
        };
        self.run_executor(executor.as_ref(), dry_run).await
    }

    #[instrument(skip(self))]
    async fn run_acquire(&self, dry_run: bool) -> KeepsakeResult<StageReport> {
        let mut report = StageReport::new(PipelineStage::Acquire);
        if dry_run {
            info!("Dry run, not contacting the source");
            return Ok(report);
        }

        let limit = *self.config.limits().batch_limit();
        let mut candidates = match self.guarded(self.acquire.candidates(limit)).await {
            Ok(candidates) => candidates,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Could not list source candidates");
                report.failed += 1;
                return Ok(report);
            }
        };
        candidates.truncate(limit);
        report.eligible = candidates.len();

        let mut outcomes = stream::iter(candidates)
            .map(|source_reference| async move {
                let result = self.guarded(self.acquire.acquire(&source_reference)).await;
                (source_reference, result)
            })
            .buffer_unordered(*self.config.limits().workers());

        while let Some((source_reference, result)) = outcomes.next().await {
            match result {
                Ok(AcquireOutcome::Acquired(record)) => {
                    report.advanced += 1;
                    self.notify(&record, PipelineStage::Acquire, EventKind::Acquired);
                }
                Ok(AcquireOutcome::AlreadyKnown(_)) => report.unchanged += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(%source_reference, error = %e, "Acquisition failed");
                    report.failed += 1;
                }
            }
        }
        info!(
            eligible = report.eligible,
            advanced = report.advanced,
            failed = report.failed,
            "Acquire finished"
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(pipeline_stage = %executor.pipeline_stage()))]
    async fn run_executor(
        &self,
        executor: &dyn StageExecutor,
        dry_run: bool,
    ) -> KeepsakeResult<StageReport> {
        let stage = executor.pipeline_stage();
        let mut report = StageReport::new(stage);

        let mut query = executor.query(*self.config.limits().batch_limit());
        if dry_run {
            query = query.as_read_only();
        }
        let records = match self.ledger.find_eligible(&query).await {
            Ok(records) => records,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Could not load eligible records");
                report.failed += 1;
                return Ok(report);
            }
        };
        report.eligible = records.len();

        if dry_run {
            for record in &records {
                info!(record_id = %record.id(), stage = %record.stage(), "Eligible (dry run)");
            }
            return Ok(report);
        }

        let mut outcomes = stream::iter(records)
            .map(|record| self.process_record(executor, record))
            .buffer_unordered(*self.config.limits().workers());
        while let Some(outcome) = outcomes.next().await {
            outcome?.tally(&mut report);
        }

        info!(
            eligible = report.eligible,
            advanced = report.advanced,
            unchanged = report.unchanged,
            conflicts = report.conflicts,
            failed = report.failed,
            "Stage finished"
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(record_id = %record.id(), stage = %record.stage()))]
    async fn process_record(
        &self,
        executor: &dyn StageExecutor,
        record: MediaRecord,
    ) -> KeepsakeResult<RecordOutcome> {
        let pipeline_stage = executor.pipeline_stage();
        let outcome = self
            .guarded(async { Ok(executor.execute(&record).await) })
            .await
            .unwrap_or_else(StageOutcome::Failed);

        match outcome {
            StageOutcome::Advanced(mutation) => {
                match self
                    .ledger
                    .apply_transition(record.id(), *record.stage(), &mutation)
                    .await
                {
                    Ok(TransitionResult::Applied(updated)) => {
                        self.notify(&updated, pipeline_stage, EventKind::Advanced);
                        Ok(RecordOutcome::Advanced)
                    }
                    Ok(TransitionResult::Conflict { current_stage }) => {
                        debug!(%current_stage, "Another worker moved the record first");
                        Ok(RecordOutcome::Conflict)
                    }
                    Err(e) if e.is_fatal() => Err(e),
                    Err(e) => self.fail(&record, pipeline_stage, e).await,
                }
            }
            StageOutcome::Unchanged(reason) => {
                debug!(%reason, "Left for a later pass");
                Ok(RecordOutcome::Unchanged)
            }
            StageOutcome::Failed(e) if e.is_fatal() => Err(e),
            StageOutcome::Failed(e) => self.fail(&record, pipeline_stage, e).await,
        }
    }

    async fn fail(
        &self,
        record: &MediaRecord,
        pipeline_stage: PipelineStage,
        error: KeepsakeError,
    ) -> KeepsakeResult<RecordOutcome> {
        let message = format!("{}: {}", pipeline_stage, error);
        let failure = if error.is_permanent() {
            Failure::permanent(message)
        } else {
            Failure::transient(message)
        };
        warn!(class = %failure.class(), error = %error, "Executor failed");

        let max_failures = *self.config.limits().max_failures();
        match self
            .ledger
            .record_failure(record.id(), &failure, max_failures)
            .await
        {
            Ok(updated) => {
                self.notify(&updated, pipeline_stage, EventKind::Failed);
                if *updated.quarantined() {
                    self.notify(&updated, pipeline_stage, EventKind::Quarantined);
                }
                Ok(RecordOutcome::Failed {
                    quarantined: *updated.quarantined(),
                })
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!(error = %e, "Could not record failure");
                Ok(RecordOutcome::Failed { quarantined: false })
            }
        }
    }

    /// Bound a collaborator call by the executor timeout and turn panics into errors.
    async fn guarded<T, F>(&self, call: F) -> KeepsakeResult<T>
    where
        F: Future<Output = KeepsakeResult<T>>,
    {
        let timeout = self.config.limits().executor_timeout();
        match tokio::time::timeout(timeout, AssertUnwindSafe(call).catch_unwind()).await {
            Err(_) => Err(CollaboratorError::new(CollaboratorErrorKind::Timeout(
                timeout.as_secs(),
            ))
            .into()),
            Ok(Err(payload)) => Err(PipelineError::new(PipelineErrorKind::ExecutorPanicked(
                panic_message(payload.as_ref()),
            ))
            .into()),
            Ok(Ok(result)) => result,
        }
    }

    fn notify(&self, record: &MediaRecord, pipeline_stage: PipelineStage, kind: EventKind) {
        let event = LifecycleEvent::for_record(record, pipeline_stage, kind, Utc::now());
        if std::panic::catch_unwind(AssertUnwindSafe(|| self.notifier.notify(&event))).is_err() {
            warn!(record_id = %record.id(), %kind, "Notifier panicked");
        }
    }
}

/// Wires an [`Orchestrator`] from its collaborators.
///
/// The notifier defaults to [`TracingNotifier`], the compressor to ffmpeg as
/// configured, and the local store to the configured media root.
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Option<PipelineConfig>,
    ledger: Option<Arc<dyn LedgerStore>>,
    source: Option<Arc<dyn SourceService>>,
    replica_a: Option<Arc<dyn ReplicationTarget>>,
    replica_b: Option<Arc<dyn ReplicationTarget>>,
    compressor: Option<Arc<dyn Compressor>>,
    deletion: Option<Arc<dyn DeletionService>>,
    notifier: Option<Arc<dyn Notifier>>,
    local_store: Option<LocalMediaStore>,
}

fn require<T>(component: Option<T>, name: &str) -> KeepsakeResult<T> {
    component.ok_or_else(|| {
        PipelineError::new(PipelineErrorKind::MissingComponent(name.to_string())).into()
    })
}

impl OrchestratorBuilder {
    /// Pipeline configuration (required).
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Ledger (required).
    pub fn ledger(mut self, ledger: Arc<dyn LedgerStore>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Source download service (required).
    pub fn source(mut self, source: Arc<dyn SourceService>) -> Self {
        self.source = Some(source);
        self
    }

    /// Replication target for destination A (required).
    pub fn replica_a(mut self, target: Arc<dyn ReplicationTarget>) -> Self {
        self.replica_a = Some(target);
        self
    }

    /// Replication target for destination B (required).
    pub fn replica_b(mut self, target: Arc<dyn ReplicationTarget>) -> Self {
        self.replica_b = Some(target);
        self
    }

    /// Compressor.
    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Source deletion service (required).
    pub fn deletion(mut self, deletion: Arc<dyn DeletionService>) -> Self {
        self.deletion = Some(deletion);
        self
    }

    /// Lifecycle event sink.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Local media area.
    pub fn local_store(mut self, store: LocalMediaStore) -> Self {
        self.local_store = Some(store);
        self
    }

    /// Validate the configuration and assemble the orchestrator.
    ///
    /// # Errors
    ///
    /// - `ConfigError` when the configuration is invalid
    /// - `MissingComponent` when a required collaborator was not supplied
    /// - `DestinationMismatch` when a target's `destination_id` differs from
    ///   the destination configured for its slot
    pub fn build(self) -> KeepsakeResult<Orchestrator> {
        let config = require(self.config, "config")?;
        config.validate()?;
        let ledger = require(self.ledger, "ledger")?;
        let source = require(self.source, "source")?;
        let replica_a = require(self.replica_a, "replica_a")?;
        let replica_b = require(self.replica_b, "replica_b")?;
        let deletion = require(self.deletion, "deletion")?;

        let policy = config.replica_policy();
        for (slot, target) in [(ReplicaSlot::A, &replica_a), (ReplicaSlot::B, &replica_b)] {
            let expected = policy.destination(slot);
            if target.destination_id() != expected {
                return Err(PipelineError::new(PipelineErrorKind::DestinationMismatch {
                    slot: slot.to_string(),
                    expected: expected.to_string(),
                    actual: target.destination_id().to_string(),
                })
                .into());
            }
        }

        let compressor: Arc<dyn Compressor> = match self.compressor {
            Some(compressor) => compressor,
            None => Arc::new(FfmpegCompressor::new(
                config.compression().ffmpeg_path(),
                config.compression().profile()?,
            )),
        };
        let store = match self.local_store {
            Some(store) => store,
            None => LocalMediaStore::new(config.storage().media_root())?,
        };
        let notifier: Arc<dyn Notifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(TracingNotifier),
        };

        Ok(Orchestrator {
            acquire: AcquireExecutor::new(source, Arc::clone(&ledger), store.clone()),
            replicate_a: Arc::new(ReplicateExecutor::new(
                ReplicaSlot::A,
                replica_a,
                policy.clone(),
                store.clone(),
            )),
            replicate_b: Arc::new(ReplicateExecutor::new(
                ReplicaSlot::B,
                replica_b,
                policy.clone(),
                store.clone(),
            )),
            compress: Arc::new(CompressExecutor::new(
                compressor,
                config.compression().tier_boundaries(),
                store.clone(),
            )),
            retire: Arc::new(RetireExecutor::new(deletion, policy, store)),
            ledger,
            notifier,
            config,
        })
    }
}
