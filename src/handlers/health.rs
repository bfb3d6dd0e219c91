use axum::{Json, response::IntoResponse};
use serde_json::json;

// Liveness for the platform's health checks; the proxy has no dependencies to check
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
