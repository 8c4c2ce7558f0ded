use axum::Json;
use serde_json::{json, Value};

/// GET /
/// Liveness probe. No dependencies; always succeeds.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "Backend is live" }))
}
