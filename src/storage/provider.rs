use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::Result;

/// Blob store holding tool images, addressed by blob name
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload data under `name`, overwriting any existing blob; returns the name
    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<String>;

    /// Delete a blob if present
    ///
    /// `Ok(true)` if a blob was removed, `Ok(false)` if it was already absent.
    /// Both count as success; only `Err` reports a store failure.
    async fn delete_if_exists(&self, name: &str) -> Result<bool>;

    /// Check if a blob exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Names of all blobs in the store
    async fn list(&self) -> Result<Vec<String>>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}

/// Last timestamp handed out by `generate_blob_name`
static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Blob name for a new upload: `<epoch millis>-<original file name>`
///
/// Timestamps are strictly increasing within the process, so two uploads of
/// the same file name in one millisecond still get distinct names.
pub fn generate_blob_name(original: &str) -> String {
    let now = Utc::now().timestamp_millis();
    let prev = LAST_MILLIS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or(now);
    generate_blob_name_at(now.max(prev + 1), original)
}

fn generate_blob_name_at(millis: i64, original: &str) -> String {
    let file_name = original.replace(['/', '\\'], "_");
    let file_name = if file_name.trim().is_empty() {
        "image".to_string()
    } else {
        file_name
    };
    format!("{}-{}", millis, file_name)
}

/// Upload time encoded in a generated blob name
pub fn blob_name_timestamp(name: &str) -> Option<i64> {
    name.split_once('-')
        .and_then(|(millis, _)| millis.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_blob_name() {
        assert_eq!(generate_blob_name_at(1700000000000, "saw.png"), "1700000000000-saw.png");
        assert_eq!(generate_blob_name_at(5, "a/b\\c.jpg"), "5-a_b_c.jpg");
        assert_eq!(generate_blob_name_at(5, ""), "5-image");
    }

    #[test]
    fn test_generated_names_are_unique() {
        let names: std::collections::HashSet<String> =
            (0..100).map(|_| generate_blob_name("same.png")).collect();
        assert_eq!(names.len(), 100);
    }

    #[test]
    fn test_blob_name_timestamp() {
        let name = generate_blob_name("drill.jpg");
        let ts = blob_name_timestamp(&name).unwrap();
        assert!((Utc::now().timestamp_millis() - ts).abs() < 60_000);
        assert_eq!(blob_name_timestamp("photo.jpg"), None);
        assert_eq!(blob_name_timestamp("12-x-y.jpg"), Some(12));
    }
}
