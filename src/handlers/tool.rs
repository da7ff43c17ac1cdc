use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::{ApiResponse, AppError, Result};
use crate::models::{DeleteToolRequest, ImageUpload, ToolForm, ToolResponse};
use crate::services::ToolService;
use crate::AppState;

/// Read the scalar fields and the single `image` part of a tool form
///
/// Parts that are not `image/*` are dropped, so a non-image upload is
/// treated the same as no upload.
async fn read_tool_form(mut multipart: Multipart) -> Result<(ToolForm, Option<ImageUpload>)> {
    let mut form = ToolForm::default();
    let mut image: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::Validation(format!("Failed to process multipart: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let data = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read image: {}", e))
                })?;

                if !content_type.starts_with("image") {
                    tracing::debug!("Ignoring non-image upload {} ({})", file_name, content_type);
                    continue;
                }
                if image.is_some() {
                    return Err(AppError::Validation("Only one image may be uploaded".to_string()));
                }

                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            "id" | "description" | "hire_price" | "tool_category_id" => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read field {}: {}", name, e))
                })?;
                let slot = match name.as_str() {
                    "id" => &mut form.id,
                    "description" => &mut form.description,
                    "hire_price" => &mut form.hire_price,
                    _ => &mut form.tool_category_id,
                };
                *slot = Some(text);
            }
            _ => {}
        }
    }

    Ok((form, image))
}

/// List all tools
/// GET /tools
pub async fn list_tools(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<ToolResponse>>>> {
    let tools = ToolService::list(&state.db).await?;
    Ok(Json(ApiResponse::success(tools)))
}

/// Get tools by exact description
/// GET /tools/desc/:value
pub async fn get_tools_by_description(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Result<Json<ApiResponse<Vec<ToolResponse>>>> {
    let tools = ToolService::get_by_description(&state.db, &value).await?;
    Ok(Json(ApiResponse::success(tools)))
}

/// Get a tool by ID
/// GET /tools/:id
pub async fn get_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ToolResponse>>> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unable to find Tool with id: {}", id)))?;
    let tool = ToolService::get_by_id(&state.db, id).await?;
    Ok(Json(ApiResponse::success(tool)))
}

/// Create a tool with an image
/// POST /tools
pub async fn create_tool(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let (form, image) = read_tool_form(multipart?).await?;
    let tool = ToolService::create(&state.db, state.blobs.as_ref(), form, image).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tool))))
}

/// Update a tool, replacing its image
/// PUT /tools
pub async fn update_tool(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<ToolResponse>>> {
    let (form, image) = read_tool_form(multipart?).await?;
    let tool = ToolService::update(&state.db, state.blobs.as_ref(), &state.locks, form, image).await?;
    Ok(Json(ApiResponse::success(tool)))
}

/// Delete a tool and its image
/// DELETE /tools
pub async fn delete_tool(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DeleteToolRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let id = req
        .id
        .ok_or_else(|| AppError::Validation("Essential fields missing".to_string()))?;
    ToolService::delete(&state.db, state.blobs.as_ref(), &state.locks, id).await?;
    Ok(Json(ApiResponse::<()>::success_message("Tool deleted")))
}
