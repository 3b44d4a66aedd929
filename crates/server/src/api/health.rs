use axum::Json;
use axum::response::IntoResponse;

/// `GET /health` -- liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
