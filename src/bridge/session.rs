//! Session lifecycle: pairing, forwarding and teardown.
//!
//! # Responsibilities
//! - Dial the upstream leg for every accepted downstream connection
//! - Drop client frames that arrive before the upstream leg is open
//! - Run both forwarding directions until the first leg stops
//! - Drive the other leg closed, best-effort and within a bounded time
//!
//! # Design Decisions
//! - One task per session; both directions are polled from it, so each
//!   direction keeps its order and the session owns both sockets outright
//! - No buffering, retry or reconnect of the upstream leg

use axum::extract::ws::{Message as DownstreamMessage, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

use crate::bridge::forward::{
    pump, CloseNotice, Direction, Inbound, LegEnd, Stopped, WireMessage, CLOSE_INTERNAL_ERROR,
};
use crate::bridge::state::{Leg, LegEvent, LegPair};
use crate::bridge::tracker::{SessionId, SessionTracker};
use crate::bridge::upstream;
use crate::config::{Credential, ProxyConfig, UpstreamConfig, ValidationError};
use crate::observability::metrics;

/// How long a peer close may take before the socket is simply dropped.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Session factory shared by the listener.
///
/// Holds the read-only pieces every session needs: the upstream endpoint
/// and the credential.
#[derive(Clone)]
pub struct Bridge {
    upstream: Arc<UpstreamConfig>,
    credential: Credential,
    tracker: SessionTracker,
}

impl Bridge {
    pub fn new(upstream: UpstreamConfig, credential: Credential) -> Self {
        Self {
            upstream: Arc::new(upstream),
            credential,
            tracker: SessionTracker::new(),
        }
    }

    /// Build from a loaded config. Fails if no credential was supplied.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ValidationError> {
        match &config.credential {
            Some(credential) if !credential.is_blank() => {
                Ok(Self::new(config.upstream.clone(), credential.clone()))
            }
            _ => Err(ValidationError::MissingCredential),
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Run one session for an accepted downstream socket, returning once
    /// both legs are closed.
    pub async fn serve(&self, downstream: WebSocket, remote_addr: SocketAddr) {
        let guard = self.tracker.track();
        let session = Session {
            id: guard.id(),
            remote_addr,
            legs: LegPair::accepted(),
        };
        session.run(downstream, &self.upstream, &self.credential).await;
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("upstream", &self.upstream.url)
            .field("active_sessions", &self.tracker.active_count())
            .finish()
    }
}

/// One paired (downstream, upstream) connection set.
struct Session {
    id: SessionId,
    remote_addr: SocketAddr,
    legs: LegPair,
}

impl Session {
    async fn run(mut self, downstream: WebSocket, config: &UpstreamConfig, credential: &Credential) {
        let id = self.id;
        tracing::info!(session_id = %id, remote_addr = %self.remote_addr, "Client connected");

        let (mut down_tx, mut down_rx) = downstream.split();

        // 1. Dial upstream. Client frames that arrive meanwhile are dropped.
        let connect = upstream::connect(config, credential);
        tokio::pin!(connect);
        let connected = loop {
            tokio::select! {
                result = &mut connect => break result,
                next = down_rx.next() => {
                    let end = match next {
                        Some(Ok(message)) => match message.classify() {
                            Inbound::Data(frame) => {
                                metrics::record_dropped(Direction::ToUpstream);
                                tracing::debug!(
                                    session_id = %id,
                                    bytes = frame.payload.len(),
                                    "Upstream not open yet, dropping client frame"
                                );
                                continue;
                            }
                            Inbound::Control => continue,
                            Inbound::Close(notice) => LegEnd::Closed(notice),
                        },
                        Some(Err(err)) => LegEnd::Errored(err.to_string()),
                        None => LegEnd::Closed(None),
                    };
                    // Client left before the upstream opened; abandoning the
                    // handshake releases the upstream leg.
                    self.record_end(&Stopped { leg: Leg::Downstream, end });
                    self.legs.apply(Leg::Upstream, LegEvent::CloseStarted);
                    self.legs.apply(Leg::Upstream, LegEvent::Closed);
                    self.finish::<_, DownstreamMessage>(&mut down_tx, Leg::Downstream)
                        .await;
                    return self.ended();
                }
            }
        };

        let upstream = match connected {
            Ok(socket) => socket,
            Err(err) => {
                metrics::record_upstream_failure();
                tracing::error!(session_id = %id, error = %err, "Upstream connection failed");
                self.legs.apply(Leg::Upstream, LegEvent::Errored);
                self.legs.apply(Leg::Upstream, LegEvent::Closed);
                let notice = CloseNotice::new(CLOSE_INTERNAL_ERROR, "upstream connection failed");
                self.close_peer::<_, DownstreamMessage>(&mut down_tx, Leg::Downstream, notice)
                    .await;
                return self.ended();
            }
        };

        self.legs.apply(Leg::Upstream, LegEvent::Opened);
        tracing::info!(session_id = %id, "Connected to upstream");

        // 2. Relay in both directions until the first leg stops.
        let (mut up_tx, mut up_rx) = upstream.split();
        let stopped = tokio::select! {
            stopped = pump::<DownstreamMessage, UpstreamMessage, _, _, _>(
                &mut down_rx, &mut up_tx, Direction::ToUpstream,
            ) => stopped,
            stopped = pump::<UpstreamMessage, DownstreamMessage, _, _, _>(
                &mut up_rx, &mut down_tx, Direction::ToDownstream,
            ) => stopped,
        };

        // 3. Propagate the stop to the other leg, then release both.
        self.record_end(&stopped);
        let notice = peer_notice(&stopped);
        match stopped.leg {
            Leg::Upstream => {
                self.close_peer::<_, DownstreamMessage>(&mut down_tx, Leg::Downstream, notice)
                    .await;
                self.finish::<_, UpstreamMessage>(&mut up_tx, Leg::Upstream)
                    .await;
            }
            Leg::Downstream => {
                self.close_peer::<_, UpstreamMessage>(&mut up_tx, Leg::Upstream, notice)
                    .await;
                self.finish::<_, DownstreamMessage>(&mut down_tx, Leg::Downstream)
                    .await;
            }
        }

        self.ended()
    }

    /// Log why a leg stopped and move it out of the open state.
    fn record_end(&mut self, stopped: &Stopped) {
        let id = self.id;
        let leg = stopped.leg;
        match &stopped.end {
            LegEnd::Closed(Some(notice)) => {
                self.legs.apply(leg, LegEvent::CloseStarted);
                tracing::info!(
                    session_id = %id,
                    %leg,
                    code = notice.code,
                    reason = %notice.reason,
                    "Leg closed"
                );
            }
            LegEnd::Closed(None) => {
                self.legs.apply(leg, LegEvent::CloseStarted);
                tracing::info!(session_id = %id, %leg, "Leg closed");
            }
            LegEnd::Errored(error) => {
                self.legs.apply(leg, LegEvent::Errored);
                tracing::warn!(session_id = %id, %leg, error = %error, "Leg errored");
            }
        }
    }

    /// Send a close frame to a leg that is still open, then release it.
    /// Failures are logged and swallowed; the session is ending anyway.
    async fn close_peer<W, M>(&mut self, sink: &mut W, leg: Leg, notice: CloseNotice)
    where
        W: Sink<M> + Unpin,
        W::Error: fmt::Display,
        M: WireMessage,
    {
        if self.legs.get(leg).needs_close() {
            self.legs.apply(leg, LegEvent::CloseStarted);
            tracing::debug!(session_id = %self.id, %leg, close = %notice, "Closing peer leg");

            let attempt = tokio::time::timeout(CLOSE_TIMEOUT, async {
                sink.send(M::close(Some(notice))).await?;
                sink.close().await
            })
            .await;
            self.log_close_failure(leg, attempt);
        }
        self.legs.apply(leg, LegEvent::Closed);
    }

    /// Flush and release a leg that already stopped on its own, completing
    /// its close handshake where the transport still can.
    async fn finish<W, M>(&mut self, sink: &mut W, leg: Leg)
    where
        W: Sink<M> + Unpin,
        W::Error: fmt::Display,
    {
        let attempt = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;
        self.log_close_failure(leg, attempt);
        self.legs.apply(leg, LegEvent::Closed);
    }

    fn log_close_failure<E: fmt::Display>(
        &self,
        leg: Leg,
        attempt: Result<Result<(), E>, tokio::time::error::Elapsed>,
    ) {
        match attempt {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!(session_id = %self.id, %leg, error = %err, "Close failed, leg already gone");
            }
            Err(_) => {
                tracing::debug!(session_id = %self.id, %leg, timeout = ?CLOSE_TIMEOUT, "Close timed out");
            }
        }
    }

    fn ended(self) {
        debug_assert!(self.legs.is_finished(), "session ended with a live leg");
        tracing::info!(session_id = %self.id, remote_addr = %self.remote_addr, "Session ended");
    }
}

/// Close frame to send to the peer of the leg that stopped.
fn peer_notice(stopped: &Stopped) -> CloseNotice {
    match (stopped.leg, &stopped.end) {
        (Leg::Upstream, LegEnd::Closed(Some(notice))) if notice.is_sendable() => notice.clone(),
        (Leg::Upstream, LegEnd::Closed(_)) => CloseNotice::normal(),
        (Leg::Upstream, LegEnd::Errored(_)) => {
            CloseNotice::new(CLOSE_INTERNAL_ERROR, "upstream connection error")
        }
        (Leg::Downstream, _) => CloseNotice::normal(),
    }
}
