//! Pass reports, the pass journal and ledger statistics.

use crate::{PipelineStage, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters for one pipeline step within a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Step these counters belong to
    pub stage: PipelineStage,
    /// Records (or candidates, for acquire) considered
    pub eligible: usize,
    /// Records moved forward
    pub advanced: usize,
    /// Records left for a later pass
    pub unchanged: usize,
    /// Records another worker moved first
    pub conflicts: usize,
    /// Executor failures recorded
    pub failed: usize,
    /// Records quarantined by this step
    pub quarantined: usize,
}

impl StageReport {
    /// Empty counters for `stage`.
    pub fn new(stage: PipelineStage) -> Self {
        Self {
            stage,
            eligible: 0,
            advanced: 0,
            unchanged: 0,
            conflicts: 0,
            failed: 0,
            quarantined: 0,
        }
    }
}

/// Summary of one orchestrator pass.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use keepsake_core::{PassReport, PipelineStage, StageReport};
///
/// let mut report = PassReport::started(Utc::now(), false);
/// let mut acquire = StageReport::new(PipelineStage::Acquire);
/// acquire.advanced = 3;
/// report.push(acquire);
/// assert_eq!(report.total_advanced(), 3);
/// assert!(report.is_clean());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// When the pass began
    pub started_at: DateTime<Utc>,
    /// When the pass ended
    pub finished_at: Option<DateTime<Utc>>,
    /// Whether collaborators and ledger writes were skipped
    pub dry_run: bool,
    /// Per-step counters, in execution order
    pub stages: Vec<StageReport>,
    /// Why the pass stopped early, if it did
    pub aborted: Option<String>,
}

impl PassReport {
    /// A report for a pass that just started.
    pub fn started(started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            started_at,
            finished_at: None,
            dry_run,
            stages: Vec::new(),
            aborted: None,
        }
    }

    /// Append a finished step.
    pub fn push(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    /// Counters for a step, if it ran.
    pub fn stage(&self, stage: PipelineStage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Records advanced across all steps.
    pub fn total_advanced(&self) -> usize {
        self.stages.iter().map(|s| s.advanced).sum()
    }

    /// Failures across all steps.
    pub fn total_failed(&self) -> usize {
        self.stages.iter().map(|s| s.failed).sum()
    }

    /// Whether the pass finished without failures or abort.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.total_failed() == 0
    }
}

/// A journaled pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PassRun {
    /// Journal entry identifier
    id: i64,
    /// What the pass did
    report: PassReport,
}

impl PassRun {
    /// Create a journal entry.
    pub fn new(id: i64, report: PassReport) -> Self {
        Self { id, report }
    }
}

/// Ledger-wide counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// All records
    pub total: u64,
    /// Records excluded from automatic processing
    pub quarantined: u64,
    /// Records per stage, including stages with zero records
    pub by_stage: BTreeMap<Stage, u64>,
    /// Sum of original sizes
    pub bytes_original: u64,
    /// Sum of current sizes
    pub bytes_current: u64,
}

impl LedgerStats {
    /// Stats with every stage present at zero.
    pub fn empty() -> Self {
        Self {
            by_stage: <Stage as strum::IntoEnumIterator>::iter()
                .map(|s| (s, 0))
                .collect(),
            ..Self::default()
        }
    }

    /// Records currently at `stage`.
    pub fn count(&self, stage: Stage) -> u64 {
        self.by_stage.get(&stage).copied().unwrap_or(0)
    }
}
