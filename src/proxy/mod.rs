// Proxy module - HTTP server that forwards browser requests to the Replicate API
//
// This module implements the forwarding shim using Axum. Each inbound
// request is validated against the upstream allow-list, relayed to the
// destination named in X-Target-URL with a minimal header set, and answered
// with permissive CORS headers on every branch.

pub mod cors;

mod error;
mod handler;

use anyhow::{Context, Result};
use axum::{routing::any, Router};
use tokio::net::TcpListener;

use crate::config::Config;
use handler::forward_handler;

/// Shared state for the proxy server
#[derive(Clone)]
pub struct ProxyState {
    /// HTTP client for forwarding requests
    client: reqwest::Client,
    /// URL prefix every X-Target-URL value must start with
    upstream_prefix: String,
}

/// Build the router with the forwarding handler on every path.
/// Split out from `start_proxy` so tests can serve it on their own listener.
pub fn app(config: &Config) -> Result<Router> {
    // Build the HTTP client with timeout and connection pooling
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300)) // generous ceiling for slow model runs
        .pool_max_idle_per_host(10)
        .build()
        .context("Failed to create HTTP client")?;

    let state = ProxyState {
        client,
        upstream_prefix: config.upstream_prefix.clone(),
    };

    // The inbound path is irrelevant - the destination comes from the
    // X-Target-URL header - so every route leads to the same handler
    Ok(Router::new()
        .route("/", any(forward_handler))
        .route("/*path", any(forward_handler))
        .with_state(state))
}

/// Start the proxy server
pub async fn start_proxy(
    config: Config,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<()> {
    let app = app(&config)?;

    tracing::info!("Starting proxy on {}", config.bind_addr);

    // Bind and serve
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Proxy listening on {}, forwarding targets under {}",
        config.bind_addr,
        config.upstream_prefix
    );

    // Start serving requests with graceful shutdown
    // When shutdown_rx receives a signal, the server will stop accepting new
    // connections and gracefully finish processing existing requests
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("Proxy server shut down gracefully");
    Ok(())
}
