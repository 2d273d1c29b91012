//! Bridge error definitions.

use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::http::StatusCode;

/// Errors that can occur while establishing or running a session.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configured endpoint could not be turned into a URL.
    #[error("invalid upstream endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    /// Handshake request could not be built (bad header name or value).
    #[error("invalid upstream request: {0}")]
    Request(String),

    /// Upstream answered the upgrade with a non-101 status (e.g. 401).
    #[error("upstream rejected handshake with status {0}")]
    Rejected(StatusCode),

    /// Handshake did not finish within the configured deadline.
    #[error("upstream handshake timed out after {0:?}")]
    Timeout(Duration),

    /// Network, TLS or protocol failure while connecting.
    #[error("upstream connection failed: {0}")]
    Connect(#[source] tungstenite::Error),
}

impl From<tungstenite::Error> for BridgeError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::Http(response) => BridgeError::Rejected(response.status()),
            other => BridgeError::Connect(other),
        }
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
