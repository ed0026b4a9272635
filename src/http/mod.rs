pub mod routes;
pub mod session;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::http::state::HttpState;

const UPLOAD_LIMIT: usize = 64 * 1024 * 1024;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/login", post(routes::login))
        .route("/api/logout", post(routes::logout))
        .route("/api/session", get(routes::session))
        .route("/api/predict", post(routes::predict))
        .route("/api/predictions", get(routes::list_predictions).delete(routes::clear_predictions))
        .route("/api/summary", get(routes::summary))
        .route("/api/summary/chart.svg", get(routes::summary_chart))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .with_state(state)
}

/// API router plus the static UI shell, CORS and request tracing.
pub fn app(state: HttpState, static_dir: &Path) -> Router {
    router(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
