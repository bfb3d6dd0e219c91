//! Error responses returned by the proxy endpoint.

use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::metrics::{RATE_LIMITED, TRANSPORT_FAILURES, UPSTREAM_FAILURES};

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Missing targetUrl in request body")]
    MissingTargetUrl,

    /// The inbound body could not be read, e.g. it exceeds the size limit.
    #[error("{message}")]
    Body { status: StatusCode, message: String },

    #[error("Rate limit exceeded. Please try again in {} minute(s).", retry_minutes(.retry_after))]
    RateLimited { retry_after: Duration },

    /// The webhook answered with a non-2xx status.
    #[error("n8n Error: {status_text}")]
    Upstream {
        status: StatusCode,
        status_text: String,
        details: String,
    },

    /// The webhook could not be reached or its response could not be read.
    #[error("Proxy Request Failed")]
    Transport(String),
}

/// Whole minutes until the window resets, rounded up and never below one.
pub fn retry_minutes(retry_after: &Duration) -> u128 {
    retry_after.as_millis().div_ceil(60_000).max(1)
}

impl ProxyError {
    /// Status code the client receives for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingTargetUrl => StatusCode::BAD_REQUEST,
            Self::Body { status, .. } => *status,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { status, .. } => *status,
            Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ProxyError {
    fn from(rejection: BytesRejection) -> Self {
        ProxyError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Transport(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = self.status();
        match self {
            Self::MethodNotAllowed => {
                debug!("Rejected non-POST request");
                (status, Json(json!({ "error": message }))).into_response()
            }
            Self::MissingTargetUrl => {
                debug!("Rejected request without targetUrl");
                (status, Json(json!({ "error": message }))).into_response()
            }
            Self::Body { .. } => {
                debug!(%status, "Rejected unreadable request body");
                (status, Json(json!({ "error": message }))).into_response()
            }
            Self::RateLimited { retry_after } => {
                RATE_LIMITED.inc();
                let seconds = retry_after.as_millis().div_ceil(1000).max(1);
                let retry = HeaderValue::from(seconds as u64);
                (
                    status,
                    [(RETRY_AFTER, retry)],
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
            Self::Upstream { details, .. } => {
                UPSTREAM_FAILURES.inc();
                warn!(%status, "Webhook returned an error");
                (status, Json(json!({ "error": message, "details": details }))).into_response()
            }
            Self::Transport(reason) => {
                TRANSPORT_FAILURES.inc();
                error!(error = %reason, "Proxy Error");
                (
                    status,
                    Json(json!({ "error": message, "message": reason })),
                )
                    .into_response()
            }
        }
    }
}
