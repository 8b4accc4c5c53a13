//! HTTP server.
//!
//! Provides endpoints for:
//! - Landing page (`/`) and module pages (`/{module}`)
//! - Upload processing (`/{module}/process`)
//! - Artifact download (`/download/{filename}`)
//! - Static assets (`/static/*`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        // Pages
        .route("/", get(handlers::landing_page))
        .route("/:module", get(handlers::module_page))
        // API routes
        .route("/:module/process", post(handlers::process_module))
        .route("/download/:filename", get(handlers::download_artifact))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest_service("/static", static_files)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
