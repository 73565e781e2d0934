//! Eligibility queries against the ledger.

use crate::Stage;
use serde::{Deserialize, Serialize};

/// Which records a pipeline step wants to see.
///
/// Quarantined records never match. Results are ordered oldest-updated first.
///
/// # Examples
///
/// ```
/// use keepsake_core::{EligibilityQuery, Stage};
///
/// let query = EligibilityQuery::new(vec![Stage::Acquired, Stage::ReplicatedB], 50)
///     .missing_destination("nas");
/// assert_eq!(query.missing_replica().as_deref(), Some("nas"));
/// assert_eq!(*query.limit(), 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct EligibilityQuery {
    /// Accepted record stages
    stages: Vec<Stage>,
    /// Destination whose flag must be absent
    missing_replica: Option<String>,
    /// Maximum number of records returned
    limit: usize,
    /// Leave every row untouched, including corrupted ones
    #[serde(default)]
    read_only: bool,
}

impl EligibilityQuery {
    /// Match records in any of `stages`.
    pub fn new(stages: impl Into<Vec<Stage>>, limit: usize) -> Self {
        Self {
            stages: stages.into(),
            missing_replica: None,
            limit,
            read_only: false,
        }
    }

    /// Only match records that `destination` has not confirmed yet.
    pub fn missing_destination(mut self, destination: impl Into<String>) -> Self {
        self.missing_replica = Some(destination.into());
        self
    }

    /// Skip corrupted rows instead of quarantining them, for dry runs.
    pub fn as_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}
