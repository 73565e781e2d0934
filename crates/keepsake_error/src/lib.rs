//! Error types for the Keepsake pipeline.
//!
//! This crate provides the foundation error types used throughout the Keepsake workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Two classifications matter to the orchestrator:
//! - [`KeepsakeError::is_permanent`]: the affected record is quarantined immediately
//! - [`KeepsakeError::is_fatal`]: the whole pass is aborted
//!
//! # Examples
//!
//! ```
//! use keepsake_error::{CollaboratorError, CollaboratorErrorKind, KeepsakeResult};
//!
//! fn download() -> KeepsakeResult<Vec<u8>> {
//!     Err(CollaboratorError::new(CollaboratorErrorKind::Transient(
//!         "connection reset".to_string(),
//!     )))?
//! }
//!
//! let err = download().unwrap_err();
//! assert!(!err.is_permanent());
//! assert!(!err.is_fatal());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod collaborator;
mod config;
mod database;
mod error;
mod pipeline;
mod storage;

pub use collaborator::{CollaboratorError, CollaboratorErrorKind};
pub use config::ConfigError;
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{KeepsakeError, KeepsakeErrorKind, KeepsakeResult};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use storage::{StorageError, StorageErrorKind};
