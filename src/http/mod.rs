//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing middleware)
//!     → websocket.rs (upgrade on any path → bridge session)
//!     → health.rs (non-upgrade: status document on / and /health, else 404)
//! ```

pub mod health;
pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};
