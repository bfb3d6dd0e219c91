use std::sync::Arc;
use crate::rate_limit::RateLimitBackend;
// app's shared state

pub struct AppState {
    pub client: reqwest::Client,                 // shared outbound client, carries the forward deadline
    pub rate_limiter: Arc<dyn RateLimitBackend>, // per-client quota
    pub max_body_bytes: usize,
}
