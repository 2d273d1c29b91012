//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions and the HTTP layer produce:
//!     → logging.rs (structured log events, session_id on every line)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, when enabled)
//! ```
//!
//! # Design Decisions
//! - The credential is never logged; its Debug output is redacted
//! - Metrics are cheap (atomic increments) and no-ops when disabled

pub mod logging;
pub mod metrics;
