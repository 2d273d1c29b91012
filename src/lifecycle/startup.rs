//! Startup orchestration.
//!
//! # Responsibilities
//! - Start background tasks (metrics exporter)
//! - Bind the listener and begin accepting traffic
//! - Drain running sessions for a bounded time after shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener is only bound once the config (and its credential) has
//!   been validated

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ProxyConfig, ValidationError};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// How long running sessions may continue once shutdown has begun.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that stop the process before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Bring the proxy up and serve until a shutdown signal arrives.
pub async fn run(config: Arc<ProxyConfig>) -> Result<(), StartupError> {
    let server = HttpServer::new(Arc::clone(&config))?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let bridge = server.bridge().clone();
    server.run(listener, shutdown.subscribe()).await?;

    let remaining = bridge.tracker().drain(DRAIN_TIMEOUT).await;
    if remaining > 0 {
        tracing::warn!(remaining, "Sessions still open at exit");
    }
    Ok(())
}
