use axum::{
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::ProxyError;
use crate::forward::{UpstreamPayload, forward};
use crate::metrics::REQUEST_TOTAL;
use crate::models::ProxyRequest;
use crate::rate_limit::Decision;
use crate::state::AppState;

pub const UNKNOWN_CLIENT: &str = "unknown";

// Client key: first X-Forwarded-For hop, then X-Real-IP, else a shared bucket
pub fn client_id(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // CORS preflight
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    REQUEST_TOTAL.inc();

    match handle(&state, &method, &headers, body).await {
        Ok(payload) => payload.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<UpstreamPayload, ProxyError> {
    if *method != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    let client = client_id(headers);
    if let Decision::Denied { retry_after } = state.rate_limiter.check(&client).await {
        warn!(%client, ?retry_after, "Rate limit exceeded");
        return Err(ProxyError::RateLimited { retry_after });
    }

    // oversized or broken bodies become JSON errors too
    let body = body?;
    let request = ProxyRequest::parse(&body);
    let target = request.target().ok_or(ProxyError::MissingTargetUrl)?;

    let start_time = Instant::now();
    let result = forward(&state.client, target, request.body.as_deref()).await;
    let latency_ms = start_time.elapsed().as_millis() as u64;

    let (status, kind) = match &result {
        Ok(UpstreamPayload::Json(_)) => (StatusCode::OK, "json"),
        Ok(UpstreamPayload::Binary { .. }) => (StatusCode::OK, "binary"),
        Err(err) => (err.status(), "error"),
    };
    info!(%client, target_url = target, %status, kind, latency_ms, "Forwarded request");
    result
}
