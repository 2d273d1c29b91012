//! Realtime WebSocket proxy library.
//!
//! Bridges each downstream client WebSocket to its own upstream realtime
//! API connection, injecting the server-side credential on the way.

pub mod bridge;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use bridge::Bridge;
pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
