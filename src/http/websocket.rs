//! WebSocket entry point.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests on any path
//! - Complete upgrade handshake with client
//! - Hand the accepted socket to the bridge, one task per session
//! - Fall back to the plain HTTP responses otherwise
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Realtime API
//! ```

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::Uri,
    response::Response,
};
use std::net::SocketAddr;

use crate::http::health;
use crate::http::server::AppState;

/// Handler mounted on every path.
pub async fn entry(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(_) => return health::respond(uri.path()),
    };

    tracing::debug!(remote_addr = %remote_addr, path = %uri.path(), "WebSocket upgrade requested");

    let bridge = state.bridge.clone();
    upgrade
        .on_failed_upgrade(move |err| {
            tracing::warn!(remote_addr = %remote_addr, error = %err, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            bridge.serve(socket, remote_addr).await;
        })
}
