//! Shared utilities for integration tests: a mock realtime upstream and an
//! in-process proxy.

use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderMap, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, connect_async, MaybeTlsStream, WebSocketStream};

use realtime_proxy::config::{Credential, ProxyConfig};
use realtime_proxy::http::HttpServer;
use realtime_proxy::lifecycle::Shutdown;

pub const TEST_KEY: &str = "sk-test-key";
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[allow(dead_code)]
pub type UpstreamConn = WebSocketStream<TcpStream>;
#[allow(dead_code)]
pub type ClientConn = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the mock upstream saw on the upgrade request.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Handshake {
    pub uri: String,
    pub headers: HeaderMap,
}

#[allow(dead_code)]
impl Handshake {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Start a mock upstream that accepts every upgrade and hands the server
/// side of each connection to the test. `delay` holds the handshake back
/// after the TCP accept.
#[allow(dead_code)]
pub async fn start_mock_upstream(
    delay: Duration,
) -> (SocketAddr, mpsc::UnboundedReceiver<(Handshake, UpstreamConn)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;

                let captured: Arc<Mutex<Option<Handshake>>> = Arc::new(Mutex::new(None));
                let captured_cb = Arc::clone(&captured);
                let callback = move |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    *captured_cb.lock().unwrap() = Some(Handshake {
                        uri: req.uri().to_string(),
                        headers: req.headers().clone(),
                    });
                    Ok(response)
                };

                if let Ok(ws) = accept_hdr_async(stream, callback).await {
                    let handshake = captured.lock().unwrap().take().unwrap();
                    let _ = tx.send((handshake, ws));
                }
            });
        }
    });

    (addr, rx)
}

/// Start a mock upstream that refuses every upgrade with `status`.
#[allow(dead_code)]
pub async fn start_rejecting_upstream(status: StatusCode) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let callback = move |_req: &Request, _response: Response| -> Result<Response, ErrorResponse> {
                    let mut err = ErrorResponse::new(Some("rejected".to_string()));
                    *err.status_mut() = status;
                    Err(err)
                };
                let _ = accept_hdr_async(stream, callback).await;
            });
        }
    });

    addr
}

/// Start the proxy on an ephemeral port, pointed at `upstream_addr`.
pub async fn start_proxy(upstream_addr: SocketAddr) -> (SocketAddr, Shutdown) {
    let mut config = ProxyConfig::default();
    config.listener.bind_host = "127.0.0.1".to_string();
    config.upstream.url = format!("ws://{}/v1/realtime", upstream_addr);
    config.upstream.connect_timeout_secs = 5;
    config.credential = Some(Credential::new(TEST_KEY));

    let server = HttpServer::new(Arc::new(config)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Open a client WebSocket to the proxy.
#[allow(dead_code)]
pub async fn connect_client(proxy_addr: SocketAddr, path: &str) -> ClientConn {
    let (ws, _) = connect_async(format!("ws://{}{}", proxy_addr, path))
        .await
        .expect("proxy upgrade failed");
    ws
}

/// Wait for the next accepted upstream connection.
#[allow(dead_code)]
pub async fn next_upstream(
    rx: &mut mpsc::UnboundedReceiver<(Handshake, UpstreamConn)>,
) -> (Handshake, UpstreamConn) {
    tokio::time::timeout(STEP_TIMEOUT, rx.recv())
        .await
        .expect("no upstream connection within timeout")
        .expect("mock upstream stopped")
}

/// Next data or close message, skipping ping/pong. `None` once the stream
/// has ended.
#[allow(dead_code)]
pub async fn next_message<S>(ws: &mut WebSocketStream<S>) -> Option<Message>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let read = async {
        while let Some(next) = ws.next().await {
            match next {
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(message) => return Some(message),
                Err(_) => return None,
            }
        }
        None
    };
    tokio::time::timeout(STEP_TIMEOUT, read)
        .await
        .expect("no message within timeout")
}
