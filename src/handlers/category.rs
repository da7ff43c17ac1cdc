use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{ApiResponse, AppError, Result};
use crate::models::ToolCategory;
use crate::services::CategoryService;
use crate::AppState;

/// List all tool categories
/// GET /toolCategory
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ToolCategory>>>> {
    let categories = CategoryService::list(&state.db).await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// Get a tool category by ID
/// GET /toolCategory/:id
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ToolCategory>>> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unable to find tool category with id: {}", id)))?;
    let category = CategoryService::get(&state.db, id).await?;
    Ok(Json(ApiResponse::success(category)))
}
