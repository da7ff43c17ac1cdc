pub mod azure;
pub mod local;
pub mod memory;
pub mod provider;

pub use azure::AzureBlobStore;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use provider::*;

use std::sync::Arc;

use crate::config::{BlobProvider, BlobStoreConfig};
use crate::error::Result;

/// Build the blob store selected by configuration
pub fn build_blob_store(config: &BlobStoreConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.provider {
        BlobProvider::Local => Arc::new(LocalBlobStore::new(&config.local_path)),
        BlobProvider::Azure => Arc::new(AzureBlobStore::new(config)?),
        BlobProvider::Memory => {
            tracing::warn!("Using in-memory blob store, images are lost on restart");
            Arc::new(MemoryBlobStore::new())
        }
    };

    tracing::info!("Blob store initialized: {}", store.storage_type());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_blob_store() {
        let mut config = BlobStoreConfig::default();
        assert_eq!(build_blob_store(&config).unwrap().storage_type(), "local");

        config.provider = BlobProvider::Memory;
        assert_eq!(build_blob_store(&config).unwrap().storage_type(), "memory");

        config.provider = BlobProvider::Azure;
        assert!(build_blob_store(&config).is_err());

        config.sas_token = Some("sv=1&sig=2".to_string());
        assert_eq!(build_blob_store(&config).unwrap().storage_type(), "azure");
    }
}
