use axum::{extract::State, Json};

use crate::error::{ApiResponse, Result};
use crate::services::reconcile::{ReconcileReport, ORPHAN_GRACE};
use crate::services::ReconcileService;
use crate::AppState;

/// Run a reconciliation sweep between tool records and the blob store
/// POST /maintenance/reconcile
pub async fn reconcile(State(state): State<AppState>) -> Result<Json<ApiResponse<ReconcileReport>>> {
    let report = ReconcileService::sweep(&state.db, state.blobs.as_ref(), ORPHAN_GRACE).await?;
    Ok(Json(ApiResponse::success(report)))
}
