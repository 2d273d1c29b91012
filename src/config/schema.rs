//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All file-backed types derive Serde traits for deserialization from TOML.
//! The upstream credential is deliberately not part of the file schema; it
//! only ever comes from the environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Root configuration for the realtime proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Upstream service the bridge dials for every session.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Bearer credential injected into every upstream handshake.
    #[serde(skip)]
    pub credential: Option<Credential>,
}

impl ProxyConfig {
    /// Socket address string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listener.bind_host, self.listener.port)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// TCP port to accept downstream connections on.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Upstream realtime service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base WebSocket URL, without the query string.
    pub url: String,

    /// Model identifier appended as the `model` query parameter.
    pub model: String,

    /// Static headers sent on every upstream handshake, besides
    /// `Authorization`.
    pub headers: BTreeMap<String, String>,

    /// Upper bound on the upstream handshake, in seconds. Zero disables it.
    pub connect_timeout_secs: u64,
}

impl UpstreamConfig {
    /// Handshake deadline, if one is configured.
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    /// Full endpoint URL for a session: `<url>?model=<model>`.
    pub fn endpoint(&self) -> Result<url::Url, url::ParseError> {
        url::Url::parse_with_params(&self.url, &[("model", self.model.as_str())])
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("OpenAI-Beta".to_string(), "realtime=v1".to_string());
        Self {
            url: "wss://api.openai.com/v1/realtime".to_string(),
            model: "gpt-4o-realtime-preview-2024-12-17".to_string(),
            headers,
            connect_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Static upstream API key, shared read-only by every session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Wrap a raw secret.
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }

    /// Value of the `Authorization` header for this credential.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// True if the secret is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
