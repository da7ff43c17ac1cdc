use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::ToolCategory;

/// Tool category service (read-only)
pub struct CategoryService;

impl CategoryService {
    /// List all categories ordered by id
    pub async fn list(db: &Database) -> Result<Vec<ToolCategory>> {
        let categories: Vec<ToolCategory> =
            sqlx::query_as("SELECT id, name FROM tool_category ORDER BY id")
                .fetch_all(db.pool())
                .await?;

        Ok(categories)
    }

    /// Get a category by ID
    pub async fn get(db: &Database, id: i64) -> Result<ToolCategory> {
        let category: ToolCategory = sqlx::query_as("SELECT id, name FROM tool_category WHERE id = ?")
            .bind(id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unable to find tool category with id: {}", id)))?;

        Ok(category)
    }
}
