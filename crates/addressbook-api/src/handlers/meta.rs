//! Service-level endpoints: health, API index and the JSON 404 fallback.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use addressbook_db::log_pool_metrics;

use crate::{ApiError, AppState};

/// Liveness check. Also records pool usage at debug level.
#[utoipa::path(get, path = "/health", tag = "System",
    responses((status = 200, description = "Service is up")))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    log_pool_metrics(&state.db.pool);
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Connectivity check listing the resource roots.
#[utoipa::path(get, path = "/api/test/", tag = "System",
    responses((status = 200, description = "API index")))]
pub async fn api_index() -> impl IntoResponse {
    Json(json!({
        "message": "success",
        "endpoints": {
            "contacts": "/api/contacts/",
            "labels": "/api/labels/",
        },
    }))
}

/// Unknown routes answer with the same JSON error body as missing rows.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
