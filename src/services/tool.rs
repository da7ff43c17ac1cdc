use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{ImageUpload, Tool, ToolCategory, ToolCategoryRow, ToolFields, ToolForm, ToolResponse};
use crate::services::{CategoryService, ToolLocks};
use crate::storage::{generate_blob_name, BlobStore};

const TOOL_WITH_CATEGORY: &str = r#"
    SELECT t.id, t.description, t.hire_price, t.tool_category_id, t.image,
           c.name AS category_name
    FROM tool t
    INNER JOIN tool_category c ON c.id = t.tool_category_id
"#;

/// Tool service
///
/// Keeps each tool record and the blob named by its `image` in step:
/// - create uploads the image before inserting, so no record points at a
///   blob that was never written;
/// - update uploads the new image and commits the record before removing
///   the old image, so a failed upload leaves the tool untouched;
/// - delete removes the record before the blob, so no reader sees a tool
///   whose image is gone.
///
/// A failure between the two steps leaves at worst an orphaned blob, which
/// is logged, compensated where possible and otherwise left to
/// `ReconcileService`.
pub struct ToolService;

impl ToolService {
    /// List all tools with their category, ordered by id
    pub async fn list(db: &Database) -> Result<Vec<ToolResponse>> {
        let rows: Vec<ToolCategoryRow> = sqlx::query_as(&format!("{} ORDER BY t.id", TOOL_WITH_CATEGORY))
            .fetch_all(db.pool())
            .await?;

        Ok(rows.into_iter().map(ToolResponse::from).collect())
    }

    /// Tools whose description equals `description` exactly
    pub async fn get_by_description(db: &Database, description: &str) -> Result<Vec<ToolResponse>> {
        let rows: Vec<ToolCategoryRow> = sqlx::query_as(&format!(
            "{} WHERE t.description = ? ORDER BY t.id",
            TOOL_WITH_CATEGORY
        ))
        .bind(description)
        .fetch_all(db.pool())
        .await?;

        if rows.is_empty() {
            return Err(AppError::NotFound(format!(
                "Unable to find Tool with description: {}",
                description
            )));
        }

        Ok(rows.into_iter().map(ToolResponse::from).collect())
    }

    /// Get a tool with its category by ID
    pub async fn get_by_id(db: &Database, id: i64) -> Result<ToolResponse> {
        let row: ToolCategoryRow = sqlx::query_as(&format!("{} WHERE t.id = ?", TOOL_WITH_CATEGORY))
            .bind(id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unable to find Tool with id: {}", id)))?;

        Ok(ToolResponse::from(row))
    }

    async fn find_tool(db: &Database, id: i64) -> Result<Option<Tool>> {
        let tool: Option<Tool> = sqlx::query_as(
            "SELECT id, description, hire_price, tool_category_id, image FROM tool WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db.pool())
        .await?;

        Ok(tool)
    }

    /// Category referenced by a form; an unknown id is a validation failure
    async fn require_category(db: &Database, fields: &ToolFields) -> Result<ToolCategory> {
        CategoryService::get(db, fields.tool_category_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::Validation(format!(
                    "Tool category {} does not exist",
                    fields.tool_category_id
                )),
                other => other,
            })
    }

    /// Remove a blob written by an operation that then failed
    async fn discard_blob(blobs: &dyn BlobStore, name: &str) {
        match blobs.delete_if_exists(name).await {
            Ok(_) => tracing::info!("Discarded blob {} after failed write", name),
            Err(e) => tracing::error!("Orphaned blob {}: cleanup after failed write failed: {}", name, e),
        }
    }

    /// Create a tool and upload its image
    pub async fn create(
        db: &Database,
        blobs: &dyn BlobStore,
        form: ToolForm,
        image: Option<ImageUpload>,
    ) -> Result<ToolResponse> {
        let image = image.ok_or_else(|| AppError::Validation("No image uploaded".to_string()))?;
        let fields = form.validate()?;
        let category = Self::require_category(db, &fields).await?;

        let blob_name = blobs
            .upload(
                &generate_blob_name(&image.file_name),
                image.data,
                &image.content_type,
            )
            .await?;

        let inserted: std::result::Result<Tool, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO tool (description, hire_price, tool_category_id, image)
            VALUES (?, ?, ?, ?)
            RETURNING id, description, hire_price, tool_category_id, image
            "#,
        )
        .bind(&fields.description)
        .bind(fields.hire_price)
        .bind(fields.tool_category_id)
        .bind(&blob_name)
        .fetch_one(db.pool())
        .await;

        let tool = match inserted {
            Ok(tool) => tool,
            Err(e) => {
                tracing::warn!("Insert of tool failed after uploading {}: {}", blob_name, e);
                Self::discard_blob(blobs, &blob_name).await;
                return Err(e.into());
            }
        };

        tracing::info!("Created tool {} with image {}", tool.id, tool.image);
        Ok(ToolResponse::new(tool, category))
    }

    /// Delete a tool and then its image
    ///
    /// The record deletion stands even when the image deletion fails; that
    /// case is reported as a conflict.
    pub async fn delete(db: &Database, blobs: &dyn BlobStore, locks: &ToolLocks, id: i64) -> Result<()> {
        let _guard = locks.lock(id).await;

        let tool = Self::find_tool(db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ID not found: {}", id)))?;

        let deleted = sqlx::query("DELETE FROM tool WHERE id = ?")
            .bind(id)
            .execute(db.pool())
            .await?
            .rows_affected();

        let image_deleted = blobs.delete_if_exists(&tool.image).await;

        match (deleted, image_deleted) {
            (0, _) => Err(AppError::Conflict(format!(
                "An error has occurred whilst deleting the tool with an ID of {}: record was not deleted",
                id
            ))),
            (_, Err(e)) => {
                tracing::error!("Tool {} deleted but its image {} is orphaned: {}", id, tool.image, e);
                Err(AppError::Conflict(format!(
                    "An error has occurred whilst deleting the tool with an ID of {}: image {} could not be deleted",
                    id, tool.image
                )))
            }
            (_, Ok(existed)) => {
                if !existed {
                    tracing::warn!("Tool {} referenced image {} which was already absent", id, tool.image);
                }
                tracing::info!("Deleted tool {} and image {}", id, tool.image);
                Ok(())
            }
        }
    }

    /// Replace a tool's fields and image
    pub async fn update(
        db: &Database,
        blobs: &dyn BlobStore,
        locks: &ToolLocks,
        form: ToolForm,
        image: Option<ImageUpload>,
    ) -> Result<ToolResponse> {
        let image = image.ok_or_else(|| AppError::Validation("No image has been provided".to_string()))?;
        let id = form.validate_id()?;
        let fields = form.validate()?;

        let _guard = locks.lock(id).await;

        let mut tool = Self::find_tool(db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ID cannot be found: {}", id)))?;
        let category = Self::require_category(db, &fields).await?;

        let old_image = std::mem::take(&mut tool.image);
        let new_image = blobs
            .upload(
                &generate_blob_name(&image.file_name),
                image.data,
                &image.content_type,
            )
            .await?;

        tool.description = fields.description;
        tool.hire_price = fields.hire_price;
        tool.tool_category_id = fields.tool_category_id;
        tool.image = new_image;

        let updated = sqlx::query(
            "UPDATE tool SET description = ?, hire_price = ?, tool_category_id = ?, image = ? WHERE id = ?",
        )
        .bind(&tool.description)
        .bind(tool.hire_price)
        .bind(tool.tool_category_id)
        .bind(&tool.image)
        .bind(tool.id)
        .execute(db.pool())
        .await;

        match updated {
            Ok(res) if res.rows_affected() == 0 => {
                Self::discard_blob(blobs, &tool.image).await;
                return Err(AppError::NotFound(format!("ID cannot be found: {}", id)));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Update of tool {} failed after uploading {}: {}", id, tool.image, e);
                Self::discard_blob(blobs, &tool.image).await;
                return Err(e.into());
            }
        }

        if old_image != tool.image {
            match blobs.delete_if_exists(&old_image).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Old image {} of tool {} was already absent", old_image, id),
                Err(e) => {
                    tracing::error!("Tool {} updated but its old image {} is orphaned: {}", id, old_image, e);
                    return Err(AppError::Conflict(format!(
                        "Tool {} was updated but its old image {} could not be deleted",
                        id, old_image
                    )));
                }
            }
        }

        tracing::info!("Updated tool {}, image {} -> {}", id, old_image, tool.image);
        Ok(ToolResponse::new(tool, category))
    }
}
