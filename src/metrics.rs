use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("proxy_requests_total", "Total number of proxy requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("proxy_rate_limited_total", "Requests denied by the rate limiter").unwrap();
    pub static ref UPSTREAM_FAILURES: Counter =
        register_counter!("proxy_upstream_failures_total", "Non-2xx responses from the webhook").unwrap();
    pub static ref TRANSPORT_FAILURES: Counter =
        register_counter!("proxy_transport_failures_total", "Failed attempts to reach the webhook").unwrap();
    pub static ref FORWARD_LATENCY: Histogram = register_histogram!(
        "proxy_forward_latency_seconds",
        "Time spent waiting on the webhook in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_CLIENTS: Gauge =
        register_gauge!("proxy_rate_limit_clients", "Clients currently tracked by the rate limiter").unwrap();
}
