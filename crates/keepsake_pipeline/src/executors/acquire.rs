//! Downloads new source files into the ledger.

use keepsake_core::{MediaRecord, UpsertResult};
use keepsake_error::KeepsakeResult;
use keepsake_interface::{LedgerStore, SourceService};
use keepsake_storage::LocalMediaStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What happened to one acquisition candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// A new record was created
    Acquired(MediaRecord),
    /// The source reference is already in the ledger
    AlreadyKnown(MediaRecord),
}

/// The acquire step.
///
/// Unlike the other steps it is driven by the source's candidate list, not
/// by ledger eligibility, and it writes through `record_acquisition`.
#[derive(Clone)]
pub struct AcquireExecutor {
    source: Arc<dyn SourceService>,
    ledger: Arc<dyn LedgerStore>,
    store: LocalMediaStore,
}

impl std::fmt::Debug for AcquireExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquireExecutor").finish_non_exhaustive()
    }
}

impl AcquireExecutor {
    /// Create the step.
    pub fn new(
        source: Arc<dyn SourceService>,
        ledger: Arc<dyn LedgerStore>,
        store: LocalMediaStore,
    ) -> Self {
        Self {
            source,
            ledger,
            store,
        }
    }

    /// Source references that may need acquiring.
    pub async fn candidates(&self, limit: usize) -> KeepsakeResult<Vec<String>> {
        self.source.list_candidates(limit).await
    }

    /// Acquire one source reference.
    ///
    /// A reference already in the ledger is returned without calling the
    /// source again. If another worker records the same reference while
    /// this one downloads, the record on file wins and this download is
    /// removed.
    #[instrument(skip(self))]
    pub async fn acquire(&self, source_reference: &str) -> KeepsakeResult<AcquireOutcome> {
        if let Some(existing) = self.ledger.find_by_source_reference(source_reference).await? {
            debug!(record_id = %existing.id(), "Already acquired");
            return Ok(AcquireOutcome::AlreadyKnown(existing));
        }

        let attrs = self.source.acquire(source_reference).await?;
        match self.ledger.record_acquisition(source_reference, &attrs).await? {
            UpsertResult::Created(record) => {
                info!(record_id = %record.id(), bytes = attrs.byte_size(), "Acquired");
                Ok(AcquireOutcome::Acquired(record))
            }
            UpsertResult::Existing(record) => {
                debug!(record_id = %record.id(), "Acquired concurrently elsewhere");
                // The winner's file is the one on record; ours is a stray copy.
                if record.local_path().as_ref() != Some(attrs.local_path()) {
                    if let Err(e) = self.store.release(attrs.local_path()).await {
                        warn!(
                            record_id = %record.id(),
                            path = %attrs.local_path().display(),
                            error = %e,
                            "Could not remove duplicate download"
                        );
                    }
                }
                Ok(AcquireOutcome::AlreadyKnown(record))
            }
        }
    }
}
