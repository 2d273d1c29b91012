//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (sessions, frames, upstream failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `realtime_proxy_sessions_total` (counter): accepted downstream connections
//! - `realtime_proxy_sessions_active` (gauge): sessions currently running
//! - `realtime_proxy_frames_forwarded_total` (counter): relayed frames by direction
//! - `realtime_proxy_frames_dropped_total` (counter): frames dropped because the
//!   destination leg was not open, by direction
//! - `realtime_proxy_upstream_connect_failures_total` (counter): failed handshakes
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels stay low-cardinality (direction only)

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::bridge::Direction;

pub const SESSIONS_TOTAL: &str = "realtime_proxy_sessions_total";
pub const SESSIONS_ACTIVE: &str = "realtime_proxy_sessions_active";
pub const FRAMES_FORWARDED_TOTAL: &str = "realtime_proxy_frames_forwarded_total";
pub const FRAMES_DROPPED_TOTAL: &str = "realtime_proxy_frames_dropped_total";
pub const UPSTREAM_CONNECT_FAILURES_TOTAL: &str = "realtime_proxy_upstream_connect_failures_total";

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_opened() {
    metrics::counter!(SESSIONS_TOTAL).increment(1);
    metrics::gauge!(SESSIONS_ACTIVE).increment(1.0);
}

pub fn record_session_closed() {
    metrics::gauge!(SESSIONS_ACTIVE).decrement(1.0);
}

pub fn record_forwarded(direction: Direction) {
    metrics::counter!(FRAMES_FORWARDED_TOTAL, "direction" => direction.as_str()).increment(1);
}

pub fn record_dropped(direction: Direction) {
    metrics::counter!(FRAMES_DROPPED_TOTAL, "direction" => direction.as_str()).increment(1);
}

pub fn record_upstream_failure() {
    metrics::counter!(UPSTREAM_CONNECT_FAILURES_TOTAL).increment(1);
}
