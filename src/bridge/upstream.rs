//! Upstream leg establishment.
//!
//! # Responsibilities
//! - Build the handshake request for the configured endpoint
//! - Inject the process-wide credential as a bearer `Authorization` header
//! - Attach the static protocol headers
//! - Bound the handshake by the configured deadline
//!
//! There is no retry: a failed handshake fails the session.

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::bridge::error::{BridgeError, BridgeResult};
use crate::config::{Credential, UpstreamConfig};

/// Connected upstream socket.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the upgrade request for one session.
pub fn build_request(config: &UpstreamConfig, credential: &Credential) -> BridgeResult<Request> {
    let endpoint = config.endpoint()?;
    let mut request = endpoint.as_str().into_client_request()?;
    let headers = request.headers_mut();

    let bearer = HeaderValue::from_str(&credential.bearer())
        .map_err(|_| BridgeError::Request("credential is not a valid header value".to_string()))?;
    headers.insert(AUTHORIZATION, bearer);

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| BridgeError::Request(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| BridgeError::Request(format!("header '{}' value: {}", name, e)))?;
        headers.insert(name, value);
    }

    Ok(request)
}

/// Dial the upstream service on behalf of a session.
pub async fn connect(config: &UpstreamConfig, credential: &Credential) -> BridgeResult<UpstreamSocket> {
    let request = build_request(config, credential)?;

    let handshake = connect_async(request);
    let (socket, response) = match config.connect_timeout() {
        Some(deadline) => tokio::time::timeout(deadline, handshake)
            .await
            .map_err(|_| BridgeError::Timeout(deadline))??,
        None => handshake.await?,
    };

    tracing::debug!(status = %response.status(), "Upstream handshake complete");
    Ok(socket)
}
