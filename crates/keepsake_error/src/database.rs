//! Ledger database error types.

/// Database error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum DatabaseErrorKind {
    /// Connection or pool acquisition failed
    #[display("Database connection error: {}", _0)]
    Connection(String),
    /// Query execution failed
    #[display("Database query error: {}", _0)]
    Query(String),
    /// Serialization/deserialization error
    #[display("Serialization error: {}", _0)]
    Serialization(String),
    /// Migration error
    #[display("Migration error: {}", _0)]
    Migration(String),
    /// Record not found
    #[display("Record not found: {}", _0)]
    NotFound(String),
    /// A stored row could not be decoded into a record
    #[display("Corrupted ledger row {}", _0)]
    CorruptRow(String),
    /// A mutation tried to move a record along an illegal edge
    #[display("Invalid transition: {}", _0)]
    InvalidTransition(String),
}

impl DatabaseErrorKind {
    /// Whether the ledger itself is unusable, as opposed to a single record being bad.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Query(_) | Self::Serialization(_) | Self::Migration(_)
        )
    }
}

/// Database error with source location tracking.
///
/// # Examples
///
/// ```
/// use keepsake_error::{DatabaseError, DatabaseErrorKind};
///
/// let err = DatabaseError::new(DatabaseErrorKind::NotFound("abc".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// assert!(!err.is_fatal());
///
/// let err = DatabaseError::new(DatabaseErrorKind::Connection("disk I/O error".to_string()));
/// assert!(err.is_fatal());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Database Error: {} at line {} in {}", kind, line, file)]
pub struct DatabaseError {
    /// The kind of error that occurred
    pub kind: DatabaseErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl DatabaseError {
    /// Create a new DatabaseError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the ledger itself is unusable.
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    /// Whether the failure is tied to one record and retrying cannot fix it.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.kind,
            DatabaseErrorKind::CorruptRow(_) | DatabaseErrorKind::InvalidTransition(_)
        )
    }
}

// Diesel error conversions (only available with database feature)
#[cfg(feature = "database")]
impl From<diesel::result::Error> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => {
                DatabaseError::new(DatabaseErrorKind::NotFound("row".to_string()))
            }
            _ => DatabaseError::new(DatabaseErrorKind::Query(err.to_string())),
        }
    }
}

#[cfg(feature = "database")]
impl From<diesel::ConnectionError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<diesel::r2d2::PoolError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::r2d2::PoolError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<serde_json::Error> for DatabaseError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::new(DatabaseErrorKind::Serialization(err.to_string()))
    }
}
