//! Local file storage error types.

/// Kinds of local storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create a storage directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write or copy a file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read a file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// The local copy a record points at does not exist
    #[display("Local file missing: {}", _0)]
    Missing(String),
    /// Failed to remove a file
    #[display("Failed to remove file: {}", _0)]
    FileRemove(String),
    /// Invalid storage path
    #[display("Invalid storage path: {}", _0)]
    InvalidPath(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use keepsake_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::Missing("/incoming/IMG_0001.HEIC".to_string()));
/// assert!(format!("{}", err).contains("missing"));
/// assert!(err.is_permanent());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A missing local copy or an invalid path will not fix itself on retry.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.kind,
            StorageErrorKind::Missing(_) | StorageErrorKind::InvalidPath(_)
        )
    }
}
