//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Stop accepting on shutdown

use axum::{routing::any, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::bridge::Bridge;
use crate::config::{ProxyConfig, ValidationError};
use crate::http::websocket;

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub bridge: Bridge,
}

/// HTTP server for the realtime proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
    bridge: Bridge,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the configuration carries no credential; a listener never
    /// starts without one.
    pub fn new(config: Arc<ProxyConfig>) -> Result<Self, ValidationError> {
        let bridge = Bridge::from_config(&config)?;
        let state = AppState {
            bridge: bridge.clone(),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            bridge,
        })
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(websocket::entry))
            .route("/{*path}", any(websocket::entry))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            model = %self.config.upstream.model,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, no longer accepting");
            })
            .await?;

        tracing::info!(
            active_sessions = self.bridge.tracker().active_count(),
            "HTTP server stopped"
        );
        Ok(())
    }

    /// Session factory, for draining on shutdown.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }
}
