//! Errors reported by external collaborators (download, replication, codec, deletion).

/// Collaborator failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CollaboratorErrorKind {
    /// The asset does not exist at the origin
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Network or service hiccup; retry on a later pass
    #[display("Transient failure: {}", _0)]
    Transient(String),
    /// The codec cannot handle this file type
    #[display("Unsupported format: {}", _0)]
    UnsupportedFormat(String),
    /// The external tool ran but failed
    #[display("Tool error: {}", _0)]
    ToolError(String),
    /// The call exceeded its time budget
    #[display("Timed out after {}s", _0)]
    Timeout(u64),
    /// The collaborator explicitly refused the request
    #[display("Rejected: {}", _0)]
    Rejected(String),
}

impl CollaboratorErrorKind {
    /// Whether retrying can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UnsupportedFormat(_))
    }
}

/// Collaborator error with location tracking.
///
/// # Examples
///
/// ```
/// use keepsake_error::{CollaboratorError, CollaboratorErrorKind};
///
/// let err = CollaboratorError::new(CollaboratorErrorKind::UnsupportedFormat("x.xyz".into()));
/// assert!(err.is_permanent());
///
/// let err = CollaboratorError::new(CollaboratorErrorKind::Timeout(30));
/// assert!(!err.is_permanent());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Collaborator Error: {} at line {} in {}", kind, line, file)]
pub struct CollaboratorError {
    /// The kind of error that occurred
    pub kind: CollaboratorErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CollaboratorError {
    /// Create a new collaborator error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CollaboratorErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether retrying can never succeed.
    pub fn is_permanent(&self) -> bool {
        self.kind.is_permanent()
    }
}
