//! Service-level handlers

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// GET /health - Liveness probe, no credentials required
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "gateway",
        })),
    )
}
