//! Orchestrator error types.

/// Pipeline error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineErrorKind {
    /// A required component was not supplied to the builder
    #[display("Missing pipeline component: {}", _0)]
    MissingComponent(String),
    /// A replication target does not serve the destination configured for its slot
    #[display("Replica slot {} expects destination '{}' but target reports '{}'", slot, expected, actual)]
    DestinationMismatch {
        /// Slot name ("A" or "B")
        slot: String,
        /// Destination configured for the slot
        expected: String,
        /// Destination the target reported
        actual: String,
    },
    /// An executor panicked while processing a record
    #[display("Executor panicked: {}", _0)]
    ExecutorPanicked(String),
}

/// Pipeline error with location tracking.
///
/// # Examples
///
/// ```
/// use keepsake_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::MissingComponent("compressor".into()));
/// assert!(format!("{}", err).contains("compressor"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The kind of error that occurred
    pub kind: PipelineErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new pipeline error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
