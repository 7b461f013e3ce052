use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

// GET /
pub async fn index() -> impl IntoResponse {
    Json(json!({ "service": "pairwatch", "status": "ok" }))
}

// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}
