//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Grading and notifications
        .route("/api/v1/grade", post(http::http_post_grade))
        .route("/api/v1/notify", post(http::http_post_notify))
        .route("/api/v1/submissions/:id", get(http::http_get_submission))
        .route("/api/v1/assignments/:id/submissions", get(http::http_get_assignment_submissions))
        .route("/api/v1/assignments/:id/recalculate", post(http::http_post_recalculate))
        // Tests
        .route("/api/v1/tests/:id/status", get(http::http_get_test_status))
        .route("/api/v1/tests/:id/attempts", get(http::http_get_test_attempts))
        // Analytics
        .route("/api/v1/classes/:id/analytics", get(http::http_get_class_analytics))
        // Guardians (student-owned)
        .route("/api/v1/guardians", get(http::http_get_guardians).post(http::http_post_guardian))
        .route("/api/v1/guardians/:id", delete(http::http_delete_guardian))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
