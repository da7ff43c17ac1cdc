//! Azure Blob Storage implementation of `BlobStore`

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::BlobStoreConfig;
use crate::error::{AppError, Result};
use crate::storage::BlobStore;

use super::client::Client;

/// Azure Blob Storage container holding tool images
pub struct AzureBlobStore {
    client: Client,
}

impl AzureBlobStore {
    pub fn new(config: &BlobStoreConfig) -> Result<Self> {
        Ok(Self {
            client: Client::from_config(config)?,
        })
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<String> {
        let size = data.len();
        let res = self.client.put_blob(name, data, content_type).await;

        if !res.is_success() {
            return Err(AppError::Storage(format!(
                "Azure upload of {} failed: [{}] {}",
                name, res.error_no, res.error_message
            )));
        }

        tracing::info!("Uploaded blob {} to container {} ({} bytes)", name, self.client.container(), size);
        Ok(name.to_string())
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool> {
        let res = self.client.delete_blob(name).await;

        if res.is_success() {
            tracing::debug!("Deleted blob {} from container {}", name, self.client.container());
            return Ok(true);
        }
        if res.is_not_found() {
            tracing::debug!("Blob {} already absent", name);
            return Ok(false);
        }

        Err(AppError::Storage(format!(
            "Azure delete of {} failed: [{}] {}",
            name, res.error_no, res.error_message
        )))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let res = self.client.head_blob(name).await;

        if res.is_success() {
            return Ok(true);
        }
        if res.is_not_found() {
            return Ok(false);
        }

        Err(AppError::Storage(format!(
            "Azure properties of {} failed: [{}] {}",
            name, res.error_no, res.error_message
        )))
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.client.list_blobs().await
    }

    fn storage_type(&self) -> &'static str {
        "azure"
    }
}
