//! External services the stage executors call.

use crate::{CompressedMedia, ReplicationRequest};
use async_trait::async_trait;
use keepsake_core::{AcquiredAttrs, CompressionTier};
use keepsake_error::KeepsakeResult;
use std::path::Path;

/// Where media comes from (e.g. a cloud photo library).
#[async_trait]
pub trait SourceService: Send + Sync {
    /// Up to `limit` source references that may need acquiring.
    ///
    /// References already in the ledger may be returned again; the
    /// acquire step skips them.
    async fn list_candidates(&self, limit: usize) -> KeepsakeResult<Vec<String>>;

    /// Download one file.
    ///
    /// # Errors
    ///
    /// `NotFound` when the reference no longer exists, `Transient` for
    /// network trouble.
    async fn acquire(&self, source_reference: &str) -> KeepsakeResult<AcquiredAttrs>;
}

/// A destination that keeps a durable copy.
#[async_trait]
pub trait ReplicationTarget: Send + Sync {
    /// Identifier recorded in a record's replica flags.
    fn destination_id(&self) -> &str;

    /// Copy the file, returning true only once the copy is durably confirmed.
    ///
    /// `false` means the copy was accepted but not yet confirmed; the call is
    /// repeated on a later pass. Re-running over an existing copy must be safe.
    async fn replicate(&self, request: &ReplicationRequest) -> KeepsakeResult<bool>;
}

/// A codec tool that shrinks local files.
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Compress `local_path` at `tier`.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` for files the tool cannot handle, `ToolError`
    /// when the tool fails.
    async fn compress(
        &self,
        local_path: &Path,
        tier: CompressionTier,
    ) -> KeepsakeResult<CompressedMedia>;
}

/// Deletes originals at the source in two phases.
#[async_trait]
pub trait DeletionService: Send + Sync {
    /// Mark the original for deletion. This step is reversible.
    async fn stage_for_deletion(&self, source_reference: &str) -> KeepsakeResult<String>;

    /// Irreversibly delete a staged original. Returns whether the source confirmed.
    async fn confirm_deletion(&self, token: &str) -> KeepsakeResult<bool>;
}
