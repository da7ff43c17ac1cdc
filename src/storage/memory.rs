use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// A stored blob
#[derive(Debug, Clone)]
#[cfg_attr(not(test), allow(dead_code))]
pub struct MemoryBlob {
    pub data: Bytes,
    pub content_type: String,
}

/// In-process blob store
///
/// Uploads and deletions can be switched to fail, which is how the
/// partial-failure paths of the tool service are exercised.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, MemoryBlob>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<MemoryBlob> {
        self.blobs.get(name).map(|b| b.value().clone())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("Upload of {} rejected", name)));
        }
        self.blobs.insert(
            name.to_string(),
            MemoryBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(name.to_string())
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("Delete of {} rejected", name)));
        }
        Ok(self.blobs.remove(name).is_some())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.blobs.contains_key(name))
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.blobs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn storage_type(&self) -> &'static str {
        "memory"
    }
}
