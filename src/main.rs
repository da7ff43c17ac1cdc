mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod storage;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::error::ApiResponse;
use crate::services::{ReconcileService, ToolLocks};
use crate::storage::BlobStore;

/// Largest accepted request body (tool image uploads)
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub blobs: Arc<dyn BlobStore>,
    pub locks: ToolLocks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolhire=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting toolhire...");

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    // Initialize blob store
    let blobs = storage::build_blob_store(&config.blob_store)?;

    if config.maintenance.reconcile_interval_secs > 0 {
        let interval = Duration::from_secs(config.maintenance.reconcile_interval_secs);
        tracing::info!("Reconciliation sweep every {:?}", interval);
        tokio::spawn(ReconcileService::run_periodic(db.clone(), blobs.clone(), interval));
    }

    let state = AppState {
        db,
        blobs,
        locks: ToolLocks::new(),
    };

    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(404, "Sorry page not found!")),
    )
}

fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Tools
        .route(
            "/tools",
            get(handlers::tool::list_tools)
                .post(handlers::tool::create_tool)
                .put(handlers::tool::update_tool)
                .delete(handlers::tool::delete_tool),
        )
        .route("/tools/desc/:value", get(handlers::tool::get_tools_by_description))
        .route("/tools/:id", get(handlers::tool::get_tool))
        // Categories
        .route("/toolCategory", get(handlers::category::list_categories))
        .route("/toolCategory/:id", get(handlers::category::get_category))
        // Maintenance
        .route(
            "/maintenance/reconcile",
            axum::routing::post(handlers::maintenance::reconcile),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
