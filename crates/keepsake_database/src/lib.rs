//! SQLite ledger for the Keepsake media lifecycle pipeline.
//!
//! [`SqliteLedger`] implements [`keepsake_interface::LedgerStore`] on a
//! single SQLite file in WAL mode. Every mutation runs in an `IMMEDIATE`
//! transaction touching one row, and stage changes are a compare-and-swap
//! on the `stage` and `version` columns.
//!
//! # Example
//!
//! ```no_run
//! use keepsake_core::ReplicaPolicy;
//! use keepsake_database::SqliteLedger;
//!
//! let ledger = SqliteLedger::open("media.db", 4, ReplicaPolicy::new("nas", "pixel"))
//!     .expect("ledger opens");
//! ```

#![forbid(unsafe_code)]

mod connection;
mod ledger;
mod models;
mod schema;

pub use connection::{LedgerPool, SqlitePragmas, create_pool, run_migrations};
pub use ledger::SqliteLedger;
pub use models::{
    MediaRecordRow, NewMediaRecordRow, NewPassRunRow, PassRunRow, TransitionChangeset,
    timestamp_column,
};

use keepsake_error::DatabaseError;

/// Result type for ledger database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
