//! Local media files owned by the pipeline.

use keepsake_error::{KeepsakeResult, StorageError, StorageErrorKind};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Local media area.
///
/// Ledger paths may be absolute or relative to the store root. The store
/// never moves files on its own; a record's current stage owns its file.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> KeepsakeResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;
        tracing::info!(path = %root.display(), "Opened local media store");
        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a ledger path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Size of a local file.
    ///
    /// # Errors
    ///
    /// `Missing` (permanent) when the file does not exist.
    pub async fn file_size(&self, path: &Path) -> KeepsakeResult<u64> {
        let path = self.resolve(path);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::Missing(path.display().to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;
        if !metadata.is_file() {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
                "{} is not a regular file",
                path.display()
            )))
            .into());
        }
        Ok(metadata.len())
    }

    /// Whether a local file exists.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(self.resolve(path))
            .await
            .unwrap_or(false)
    }

    /// Hex SHA-256 of a local file.
    pub async fn sha256(&self, path: &Path) -> KeepsakeResult<String> {
        sha256_file(&self.resolve(path)).await
    }

    /// Delete a local file. Returns false if it was already gone.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn release(&self, path: &Path) -> KeepsakeResult<bool> {
        let path = self.resolve(path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Released local file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Local file already gone");
                Ok(false)
            }
            Err(e) => Err(StorageError::new(StorageErrorKind::FileRemove(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }
}

/// Stream a file through SHA-256.
pub(crate) async fn sha256_file(path: &Path) -> KeepsakeResult<String> {
    let read_error = |e: std::io::Error| {
        StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            path.display(),
            e
        )))
    };
    let mut file = tokio::fs::File::open(path).await.map_err(read_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).await.map_err(read_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
