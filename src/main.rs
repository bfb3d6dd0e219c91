use clap::Parser; // for cli
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use n8n_proxy::app;
use n8n_proxy::config::Args;
use n8n_proxy::rate_limit::{InMemoryRateLimiter, RateLimitBackend, sweeper};
use n8n_proxy::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // parse cli arguments (env vars included)
    let args = Args::parse();

    let limiter = InMemoryRateLimiter::new(args.rate_limit_max, args.rate_window());
    info!(
        max = limiter.max_requests(),
        window = ?limiter.window(),
        "Rate limit configured"
    );
    let rate_limiter: Arc<dyn RateLimitBackend> = Arc::new(limiter);

    let client = reqwest::Client::builder()
        .timeout(args.forward_deadline())
        .build()?;

    let state = Arc::new(AppState {
        client,
        rate_limiter: Arc::clone(&rate_limiter),
        max_body_bytes: args.max_body_bytes,
    });

    // spawn the expired-entry sweeper
    tokio::spawn(sweeper(rate_limiter, args.sweep_period()));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "Proxy listening");
    info!(timeout = ?args.forward_deadline(), "Forwarding deadline");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Proxy stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
