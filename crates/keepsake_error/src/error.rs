//! Top-level error wrapper types.

use crate::{CollaboratorError, ConfigError, DatabaseError, PipelineError, StorageError};

/// Every error condition the workspace can produce.
///
/// # Examples
///
/// ```
/// use keepsake_error::{KeepsakeError, ConfigError};
///
/// let config_err = ConfigError::new("ledger.path is required");
/// let err: KeepsakeError = config_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum KeepsakeErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Ledger database error
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Local file storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// External collaborator error
    #[from(CollaboratorError)]
    Collaborator(CollaboratorError),
    /// Orchestrator error
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Keepsake error with kind discrimination.
///
/// # Examples
///
/// ```
/// use keepsake_error::{KeepsakeResult, DatabaseError, DatabaseErrorKind};
///
/// fn load() -> KeepsakeResult<()> {
///     Err(DatabaseError::new(DatabaseErrorKind::Connection("unable to open".into())))?
/// }
///
/// let err = load().unwrap_err();
/// assert!(err.is_fatal());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Keepsake Error: {}", _0)]
pub struct KeepsakeError(Box<KeepsakeErrorKind>);

impl KeepsakeError {
    /// Create a new error from a kind.
    pub fn new(kind: KeepsakeErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &KeepsakeErrorKind {
        &self.0
    }

    /// Whether the affected record should be quarantined without further retries.
    pub fn is_permanent(&self) -> bool {
        match self.kind() {
            KeepsakeErrorKind::Collaborator(e) => e.is_permanent(),
            KeepsakeErrorKind::Storage(e) => e.is_permanent(),
            KeepsakeErrorKind::Database(e) => e.is_permanent(),
            KeepsakeErrorKind::Config(_) | KeepsakeErrorKind::Pipeline(_) => false,
        }
    }

    /// Whether the error means the ledger is unavailable and the pass must stop.
    pub fn is_fatal(&self) -> bool {
        match self.kind() {
            KeepsakeErrorKind::Database(e) => e.is_fatal(),
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to KeepsakeErrorKind
impl<T> From<T> for KeepsakeError
where
    T: Into<KeepsakeErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Keepsake operations.
pub type KeepsakeResult<T> = std::result::Result<T, KeepsakeError>;
