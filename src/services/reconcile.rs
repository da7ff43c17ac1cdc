use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::db::Database;
use crate::error::Result;
use crate::storage::{blob_name_timestamp, BlobStore};

/// Blobs younger than this may belong to a create or update still in flight
pub const ORPHAN_GRACE: Duration = Duration::from_secs(60);

/// A tool whose image blob is missing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DanglingTool {
    pub id: i64,
    pub image: String,
}

/// Outcome of one reconciliation sweep
#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub scanned_blobs: usize,
    pub scanned_tools: usize,
    pub deleted_orphans: Vec<String>,
    pub failed_deletions: Vec<String>,
    pub dangling_tools: Vec<DanglingTool>,
}

/// Finds blobs no tool references and tools whose blob is gone
pub struct ReconcileService;

impl ReconcileService {
    /// Delete orphaned blobs and report dangling tool references
    pub async fn sweep(db: &Database, blobs: &dyn BlobStore, grace: Duration) -> Result<ReconcileReport> {
        // Tools first: a tool inserted after this point has a fresh blob,
        // which the grace period keeps from being swept.
        let tools: Vec<(i64, String)> = sqlx::query_as("SELECT id, image FROM tool ORDER BY id")
            .fetch_all(db.pool())
            .await?;
        let blob_names = blobs.list().await?;

        let referenced: HashSet<&str> = tools.iter().map(|(_, image)| image.as_str()).collect();
        let existing: HashSet<&str> = blob_names.iter().map(String::as_str).collect();
        let cutoff = Utc::now().timestamp_millis() - grace.as_millis() as i64;

        let mut report = ReconcileReport {
            scanned_blobs: blob_names.len(),
            scanned_tools: tools.len(),
            ..ReconcileReport::default()
        };

        for name in &blob_names {
            if referenced.contains(name.as_str()) {
                continue;
            }
            match blob_name_timestamp(name) {
                Some(ts) if ts > cutoff => continue,
                _ => {}
            }

            match blobs.delete_if_exists(name).await {
                Ok(_) => {
                    tracing::info!("Deleted orphaned blob {}", name);
                    report.deleted_orphans.push(name.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to delete orphaned blob {}: {}", name, e);
                    report.failed_deletions.push(name.clone());
                }
            }
        }

        for (id, image) in &tools {
            if existing.contains(image.as_str()) {
                continue;
            }
            // An update or delete may have run since the tools were read
            let current: Option<(String,)> = sqlx::query_as("SELECT image FROM tool WHERE id = ?")
                .bind(id)
                .fetch_optional(db.pool())
                .await?;
            let Some((current,)) = current else {
                continue;
            };
            if blobs.exists(&current).await? {
                continue;
            }

            tracing::warn!("Tool {} references missing image {}", id, current);
            report.dangling_tools.push(DanglingTool {
                id: *id,
                image: current,
            });
        }

        tracing::info!(
            "Reconciliation finished: {} blobs, {} tools, {} orphans deleted, {} failed, {} dangling",
            report.scanned_blobs,
            report.scanned_tools,
            report.deleted_orphans.len(),
            report.failed_deletions.len(),
            report.dangling_tools.len()
        );
        Ok(report)
    }

    /// Run `sweep` every `interval` until the process exits
    pub async fn run_periodic(db: Database, blobs: std::sync::Arc<dyn BlobStore>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = Self::sweep(&db, blobs.as_ref(), ORPHAN_GRACE).await {
                tracing::error!("Reconciliation sweep failed: {}", e);
            }
        }
    }
}
