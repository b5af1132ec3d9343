use axum::{Json, Router, response::IntoResponse, routing::get};
use serde_json::json;

use crate::ApiState;

pub fn routes() -> Router<ApiState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
