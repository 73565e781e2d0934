//! Request and response types exchanged with collaborators.

use keepsake_core::MediaRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file to copy to a replication destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ReplicationRequest {
    /// Ledger record id
    record_id: String,
    /// Identifier of the file at its origin
    source_reference: String,
    /// Local file to copy
    local_path: PathBuf,
    /// Expected size in bytes
    byte_size: u64,
}

impl ReplicationRequest {
    /// Describe a replication of `record`'s local file.
    ///
    /// Returns `None` when the record no longer holds a local file.
    pub fn for_record(record: &MediaRecord) -> Option<Self> {
        record.local_path().as_ref().map(|path| Self {
            record_id: record.id().clone(),
            source_reference: record.source_reference().clone(),
            local_path: path.clone(),
            byte_size: *record.byte_size_current(),
        })
    }

    /// The same request pointing at `local_path`, e.g. after resolving a
    /// relative ledger path.
    pub fn with_local_path(mut self, local_path: impl Into<PathBuf>) -> Self {
        self.local_path = local_path.into();
        self
    }
}

/// The file a compressor produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CompressedMedia {
    /// Where the compressed file lives
    local_path: PathBuf,
    /// Its size in bytes
    byte_size: u64,
}

impl CompressedMedia {
    /// Describe a compressed file.
    pub fn new(local_path: impl Into<PathBuf>, byte_size: u64) -> Self {
        Self {
            local_path: local_path.into(),
            byte_size,
        }
    }
}
