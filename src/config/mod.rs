//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → environment overlay (credential, port, model, upstream URL)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc with the listener and every session
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no ambient globals inside sessions
//! - All fields have defaults to allow running from the environment alone
//! - A missing credential fails the load, never a single session

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_with, ConfigError};
pub use schema::{Credential, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, UpstreamConfig};
pub use validation::ValidationError;
