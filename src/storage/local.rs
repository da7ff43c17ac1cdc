use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// Local file system blob store, one file per blob
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn get_full_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(AppError::Storage(format!("Invalid blob name: {}", name)));
        }
        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<String> {
        let full_path = self.get_full_path(name)?;
        fs::create_dir_all(&self.base_path).await?;

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!("Saved blob {:?} ({}, {} bytes)", full_path, content_type, data.len());
        Ok(name.to_string())
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool> {
        let full_path = self.get_full_path(name)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted blob {:?}", full_path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to delete blob {}: {}",
                name, e
            ))),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let full_path = self.get_full_path(name)?;
        Ok(fs::try_exists(&full_path).await?)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_overwrite_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        store.upload("1-a.png", Bytes::from_static(b"one"), "image/png").await.unwrap();
        store.upload("1-a.png", Bytes::from_static(b"two"), "image/png").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("1-a.png")).unwrap(), b"two");
        assert!(store.exists("1-a.png").await.unwrap());

        assert!(store.delete_if_exists("1-a.png").await.unwrap());
        assert!(!store.delete_if_exists("1-a.png").await.unwrap());
        assert!(!store.exists("1-a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("images"));
        assert!(store.list().await.unwrap().is_empty());

        store.upload("2-b.png", Bytes::from_static(b"b"), "image/png").await.unwrap();
        store.upload("1-a.png", Bytes::from_static(b"a"), "image/png").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["1-a.png", "2-b.png"]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(store.upload("../x", Bytes::new(), "image/png").await.is_err());
        assert!(store.delete_if_exists("..").await.is_err());
    }
}
