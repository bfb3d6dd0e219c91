//! Outbound call to the webhook and shaping of what comes back.

use axum::{
    body::Bytes,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde_json::value::RawValue;
use std::time::Instant;

use crate::error::ProxyError;
use crate::metrics::FORWARD_LATENCY;

/// A successful webhook response, ready to be relayed.
#[derive(Debug, Clone)]
pub enum UpstreamPayload {
    /// Validated JSON text, relayed exactly as the webhook sent it.
    Json(Box<RawValue>),
    Binary { bytes: Bytes, content_type: HeaderValue },
}

impl UpstreamPayload {
    /// Decide how a 2xx body is relayed based on its content type.
    ///
    /// JSON bodies are validated but kept as text (a parse failure is a
    /// transport failure); anything else is passed through as raw bytes.
    pub fn from_parts(content_type: Option<&HeaderValue>, bytes: Bytes) -> Result<Self, ProxyError> {
        let is_json = content_type
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        if is_json {
            return Ok(UpstreamPayload::Json(serde_json::from_slice(&bytes)?));
        }

        Ok(UpstreamPayload::Binary {
            bytes,
            content_type: content_type
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream")),
        })
    }
}

impl IntoResponse for UpstreamPayload {
    fn into_response(self) -> Response {
        match self {
            UpstreamPayload::Json(raw) => (
                StatusCode::OK,
                [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                String::from(raw.get()),
            )
                .into_response(),
            UpstreamPayload::Binary { bytes, content_type } => {
                (StatusCode::OK, [(CONTENT_TYPE, content_type)], bytes).into_response()
            }
        }
    }
}

// POST the opaque body to the target and buffer the whole answer
pub async fn forward(
    client: &reqwest::Client,
    target_url: &str,
    body: Option<&RawValue>,
) -> Result<UpstreamPayload, ProxyError> {
    let mut request = client
        .post(target_url)
        .header(CONTENT_TYPE, "application/json");
    if let Some(body) = body {
        request = request.body(body.get().to_owned());
    }

    let start_time = Instant::now();
    let response = request.send().await;
    FORWARD_LATENCY.observe(start_time.elapsed().as_secs_f64());
    let response = response?;

    let status = response.status();
    if !status.is_success() {
        let details = response.text().await?;
        return Err(ProxyError::Upstream {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            details,
        });
    }

    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let bytes = response.bytes().await?;
    UpstreamPayload::from_parts(content_type.as_ref(), bytes)
}
