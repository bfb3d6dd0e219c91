//! Rate limited forwarding proxy for the product recoloring webhook.
//!
//! Browsers served over HTTPS cannot call a plain-HTTP automation webhook
//! directly, so the front-end posts `{targetUrl, body}` here and this
//! service performs the call on its behalf, relaying JSON or image bytes.

pub mod config;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue,
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        },
    },
    middleware,
    response::Response,
    routing::{any, get},
};
use std::sync::Arc;

use crate::handlers::{health_handler, metrics_handler, proxy_handler};
use crate::state::AppState;

pub const ALLOW_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
pub const ALLOW_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, \
    Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

// Permissive CORS on every response, this is a public utility proxy
async fn cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    response
}

/// Build the router with all routes, CORS and the inbound body limit.
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .route("/proxy", any(proxy_handler))
        .route("/api/n8n-proxy", any(proxy_handler)) // path the front-end calls
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::map_response(cors_headers))
        .with_state(state)
}
