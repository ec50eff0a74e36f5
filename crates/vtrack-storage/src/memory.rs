//! In-memory blob store for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::BlobStore;

/// Stored object with its content type.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// `BlobStore` backed by a map. Uploads can be made to fail a fixed number
/// of times to exercise retries.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    failing_uploads: AtomicU32,
    upload_attempts: AtomicU32,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly.
    pub fn insert(&self, key: &str, data: Vec<u8>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(
                key.to_string(),
                StoredObject {
                    data,
                    content_type: "application/octet-stream".to_string(),
                },
            );
        }
    }

    /// Fail the next `n` uploads with a retryable error.
    pub fn fail_next_uploads(&self, n: u32) {
        self.failing_uploads.store(n, Ordering::SeqCst);
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().ok()?.get(key).cloned()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Upload calls so far, failed ones included.
    pub fn upload_attempts(&self) -> u32 {
        self.upload_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        self.upload_attempts.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failing_uploads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StorageError::upload_failed(format!("injected failure for {}", key)));
        }

        let mut objects = self
            .objects
            .write()
            .map_err(|_| StorageError::upload_failed("store lock poisoned"))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.get(key)
            .map(|o| o.data)
            .ok_or_else(|| StorageError::not_found(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_download() {
        let store = MemoryBlobStore::new();
        store.upload("a/b.jpg", vec![1, 2, 3], "image/jpeg").await.unwrap();

        assert_eq!(store.download("a/b.jpg").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(store.get("a/b.jpg").unwrap().content_type, "image/jpeg");
        assert!(matches!(
            store.download("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryBlobStore::new();
        store.fail_next_uploads(2);

        assert!(store.upload("k", vec![], "x").await.is_err());
        assert!(store.upload("k", vec![], "x").await.is_err());
        assert!(store.upload("k", vec![], "x").await.is_ok());
        assert_eq!(store.upload_attempts(), 3);
    }

    #[tokio::test]
    async fn test_download_to_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryBlobStore::new();
        store.insert("source/game1.mp4", b"video".to_vec());

        let path = dir.path().join("nested/input.mp4");
        store.download_to_file("source/game1.mp4", &path).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"video");
    }
}
