mod health;
mod metrics;
mod proxy;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use proxy::{UNKNOWN_CLIENT, client_id, proxy_handler};
