//! Replication to a mounted directory.

use crate::local::sha256_file;
use async_trait::async_trait;
use keepsake_error::{
    CollaboratorError, CollaboratorErrorKind, KeepsakeResult, StorageError, StorageErrorKind,
};
use keepsake_interface::{ReplicationRequest, ReplicationTarget};
use std::path::{Path, PathBuf};

/// Replication destination on a locally mounted directory, such as a NAS share.
///
/// Copies land at `{root}/{record_id}/{file_name}`. A copy is written to a
/// `.partial` file, flushed to disk and renamed into place, so a present
/// replica is always complete. Re-running over an existing replica only
/// reconciles its size (and checksum, when enabled).
#[derive(Debug, Clone)]
pub struct DirectoryReplicationTarget {
    destination_id: String,
    root: PathBuf,
    verify_checksum: bool,
}

impl DirectoryReplicationTarget {
    /// Create a target, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn new(destination_id: impl Into<String>, root: impl Into<PathBuf>) -> KeepsakeResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;
        Ok(Self {
            destination_id: destination_id.into(),
            root,
            verify_checksum: false,
        })
    }

    /// Also compare SHA-256 digests when reconciling a replica.
    pub fn with_checksum(mut self, verify_checksum: bool) -> Self {
        self.verify_checksum = verify_checksum;
        self
    }

    /// Where the replica of `request` lives.
    pub fn replica_path(&self, request: &ReplicationRequest) -> PathBuf {
        let file_name = request
            .local_path()
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| request.record_id().into());
        self.root.join(request.record_id()).join(file_name)
    }

    async fn matches(&self, source: &Path, replica: &Path, source_size: u64) -> KeepsakeResult<bool> {
        let replica_size = match tokio::fs::metadata(replica).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(transient(format!("stat {}: {}", replica.display(), e)));
            }
        };
        if replica_size != source_size {
            tracing::debug!(replica_size, source_size, "Replica size differs");
            return Ok(false);
        }
        if self.verify_checksum {
            return Ok(sha256_file(source).await? == sha256_file(replica).await?);
        }
        Ok(true)
    }
}

fn transient(message: String) -> keepsake_error::KeepsakeError {
    CollaboratorError::new(CollaboratorErrorKind::Transient(message)).into()
}

#[async_trait]
impl ReplicationTarget for DirectoryReplicationTarget {
    fn destination_id(&self) -> &str {
        &self.destination_id
    }

    #[tracing::instrument(
        skip(self, request),
        fields(destination = %self.destination_id, record_id = %request.record_id())
    )]
    async fn replicate(&self, request: &ReplicationRequest) -> KeepsakeResult<bool> {
        let source = request.local_path();
        let source_size = match tokio::fs::metadata(source).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(
                    StorageError::new(StorageErrorKind::Missing(source.display().to_string()))
                        .into(),
                );
            }
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    source.display(),
                    e
                )))
                .into());
            }
        };

        let replica = self.replica_path(request);
        if self.matches(source, &replica, source_size).await? {
            tracing::debug!(path = %replica.display(), "Replica already present");
            return Ok(true);
        }

        if let Some(parent) = replica.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| transient(format!("create {}: {}", parent.display(), e)))?;
        }

        let mut partial = replica.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        tokio::fs::copy(source, &partial)
            .await
            .map_err(|e| transient(format!("copy to {}: {}", partial.display(), e)))?;
        let file = tokio::fs::File::open(&partial)
            .await
            .map_err(|e| transient(format!("open {}: {}", partial.display(), e)))?;
        file.sync_all()
            .await
            .map_err(|e| transient(format!("sync {}: {}", partial.display(), e)))?;
        drop(file);
        tokio::fs::rename(&partial, &replica)
            .await
            .map_err(|e| transient(format!("rename to {}: {}", replica.display(), e)))?;

        if !self.matches(source, &replica, source_size).await? {
            let _ = tokio::fs::remove_file(&replica).await;
            return Err(transient(format!(
                "replica {} does not match source after copy",
                replica.display()
            )));
        }

        tracing::info!(path = %replica.display(), bytes = source_size, "Replicated");
        Ok(true)
    }
}
