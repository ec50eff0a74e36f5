//! Blob store abstraction.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

/// Key/value object storage.
///
/// Writes are idempotent per key, so callers may retry uploads freely.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Fetch the object stored under `key`.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Fetch the object under `key` into a local file, creating parent
    /// directories as needed.
    async fn download_to_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        let bytes = self.download(key).await?;
        write_file(path, &bytes).await
    }

    /// Verify the store is reachable.
    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}

pub(crate) async fn write_file(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::download_failed(format!("Failed to create directory: {}", e)))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| StorageError::download_failed(format!("Failed to write file: {}", e)))
}
