//! Plain HTTP responses for non-upgrade requests.
//!
//! `/` and `/health` report a fixed status document; every other path is
//! a 404. Upgrade requests never reach this module.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Name reported in the status document.
pub const SERVICE_NAME: &str = "realtime-proxy";

/// Body of the health response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            service: SERVICE_NAME,
        }
    }
}

/// True for paths that answer with the health document.
pub fn is_health_path(path: &str) -> bool {
    matches!(path, "/" | "/health")
}

/// Respond to a request that did not ask for a WebSocket upgrade.
pub fn respond(path: &str) -> Response {
    if is_health_path(path) {
        (StatusCode::OK, Json(HealthStatus::ok())).into_response()
    } else {
        tracing::debug!(path = %path, "No handler for plain HTTP request");
        (StatusCode::NOT_FOUND, "Not Found").into_response()
    }
}
