//! One-way forwarding between the two legs of a session.
//!
//! # Data Flow
//! ```text
//! Downstream reader ──pump(ToUpstream)──▶ Upstream writer     (verbatim)
//! Upstream reader ──pump(ToDownstream)──▶ Downstream writer   (text normalized)
//! ```
//!
//! Each pump reads from one leg and writes to the other until the source
//! leg closes or errors, or until a write to the destination fails. It
//! then reports which leg stopped and why; the session decides how to tear
//! down the peer.

use axum::extract::ws::{CloseFrame as DownstreamCloseFrame, Message as DownstreamMessage};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as UpstreamCloseFrame;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

use crate::bridge::frame::Frame;
use crate::bridge::state::Leg;
use crate::observability::metrics;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Unexpected condition on the server side.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Direction of message flow through a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client → realtime service
    ToUpstream,
    /// Realtime service → client
    ToDownstream,
}

impl Direction {
    pub fn source(self) -> Leg {
        match self {
            Direction::ToUpstream => Leg::Downstream,
            Direction::ToDownstream => Leg::Upstream,
        }
    }

    pub fn destination(self) -> Leg {
        self.source().peer()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::ToUpstream => "to_upstream",
            Direction::ToDownstream => "to_downstream",
        }
    }
}

/// Close code and reason, independent of transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseNotice {
    pub code: u16,
    pub reason: String,
}

impl CloseNotice {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn normal() -> Self {
        Self::new(CLOSE_NORMAL, "")
    }

    /// Codes an endpoint may put on the wire. 1004-1006 and 1015 are
    /// reserved for local reporting only.
    pub fn is_sendable(&self) -> bool {
        matches!(self.code, 1000..=1003 | 1007..=1014 | 3000..=4999)
    }
}

impl fmt::Display for CloseNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.reason)
        }
    }
}

/// What a read from a leg produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Data(Frame),
    Close(Option<CloseNotice>),
    /// Ping/pong and raw frames; answered by the transport itself.
    Control,
}

/// A transport message type one of the legs speaks.
pub trait WireMessage: Sized {
    fn classify(self) -> Inbound;

    /// Frame a relayed payload for this transport.
    fn data(frame: Frame) -> Self;

    fn close(notice: Option<CloseNotice>) -> Self;
}

impl WireMessage for DownstreamMessage {
    fn classify(self) -> Inbound {
        match self {
            DownstreamMessage::Close(frame) => Inbound::Close(
                frame.map(|f| CloseNotice::new(f.code, f.reason.as_str())),
            ),
            other => Frame::from_downstream(other).map_or(Inbound::Control, Inbound::Data),
        }
    }

    fn data(frame: Frame) -> Self {
        frame.into_downstream()
    }

    fn close(notice: Option<CloseNotice>) -> Self {
        DownstreamMessage::Close(notice.map(|n| DownstreamCloseFrame {
            code: n.code,
            reason: n.reason.into(),
        }))
    }
}

impl WireMessage for UpstreamMessage {
    fn classify(self) -> Inbound {
        match self {
            UpstreamMessage::Close(frame) => Inbound::Close(
                frame.map(|f| CloseNotice::new(u16::from(f.code), f.reason.as_str())),
            ),
            other => Frame::from_upstream(other).map_or(Inbound::Control, Inbound::Data),
        }
    }

    fn data(frame: Frame) -> Self {
        frame.into_upstream()
    }

    fn close(notice: Option<CloseNotice>) -> Self {
        UpstreamMessage::Close(notice.map(|n| UpstreamCloseFrame {
            code: CloseCode::from(n.code),
            reason: n.reason.into(),
        }))
    }
}

/// How a leg stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegEnd {
    /// Orderly close, with the peer's close frame if it sent one. A stream
    /// that simply ends is reported as `Closed(None)`.
    Closed(Option<CloseNotice>),
    /// Transport failure.
    Errored(String),
}

/// Outcome of a pump: the first leg observed to leave the open state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopped {
    pub leg: Leg,
    pub end: LegEnd,
}

/// Relay every data message from `reader` to `writer`, in order, until
/// either leg stops.
pub async fn pump<I, O, R, W, E>(reader: &mut R, writer: &mut W, direction: Direction) -> Stopped
where
    I: WireMessage,
    O: WireMessage,
    R: Stream<Item = Result<I, E>> + Unpin,
    E: fmt::Display,
    W: Sink<O> + Unpin,
    W::Error: fmt::Display,
{
    while let Some(next) = reader.next().await {
        let message = match next {
            Ok(message) => message,
            Err(err) => {
                return Stopped {
                    leg: direction.source(),
                    end: LegEnd::Errored(err.to_string()),
                };
            }
        };

        let frame = match message.classify() {
            Inbound::Data(frame) => frame,
            Inbound::Control => continue,
            Inbound::Close(notice) => {
                return Stopped {
                    leg: direction.source(),
                    end: LegEnd::Closed(notice),
                };
            }
        };

        let len = frame.payload.len();
        if let Err(err) = writer.send(O::data(frame)).await {
            metrics::record_dropped(direction);
            return Stopped {
                leg: direction.destination(),
                end: LegEnd::Errored(err.to_string()),
            };
        }

        metrics::record_forwarded(direction);
        tracing::trace!(direction = direction.as_str(), bytes = len, "Frame forwarded");
    }

    Stopped {
        leg: direction.source(),
        end: LegEnd::Closed(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use futures_util::stream;
    use std::convert::Infallible;

    #[tokio::test]
    async fn preserves_order_and_framing_towards_upstream() {
        let mut reader = stream::iter(vec![
            Ok::<_, Infallible>(DownstreamMessage::Text(r#"{"type":"response.create"}"#.into())),
            Ok(DownstreamMessage::Binary(Bytes::from_static(&[1, 2, 3]))),
            Ok(DownstreamMessage::Ping(Bytes::new())),
            Ok(DownstreamMessage::Text("second".into())),
        ]);
        let mut sent: Vec<UpstreamMessage> = Vec::new();

        let stopped = pump::<DownstreamMessage, UpstreamMessage, _, _, _>(
            &mut reader,
            &mut sent,
            Direction::ToUpstream,
        )
        .await;

        assert_eq!(
            stopped,
            Stopped {
                leg: Leg::Downstream,
                end: LegEnd::Closed(None),
            }
        );
        assert_eq!(
            sent,
            vec![
                UpstreamMessage::text(r#"{"type":"response.create"}"#.to_string()),
                UpstreamMessage::Binary(Bytes::from_static(&[1, 2, 3])),
                UpstreamMessage::text("second".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn upstream_close_frame_stops_the_pump() {
        let mut reader = stream::iter(vec![
            Ok::<_, Infallible>(UpstreamMessage::text(r#"{"type":"response.done"}"#.to_string())),
            Ok(UpstreamMessage::close(Some(CloseNotice::new(4000, "session expired")))),
            Ok(UpstreamMessage::text("after close".to_string())),
        ]);
        let mut sent: Vec<DownstreamMessage> = Vec::new();

        let stopped = pump::<UpstreamMessage, DownstreamMessage, _, _, _>(
            &mut reader,
            &mut sent,
            Direction::ToDownstream,
        )
        .await;

        assert_eq!(stopped.leg, Leg::Upstream);
        assert_eq!(
            stopped.end,
            LegEnd::Closed(Some(CloseNotice::new(4000, "session expired")))
        );
        assert_eq!(
            sent,
            vec![DownstreamMessage::Text(r#"{"type":"response.done"}"#.into())]
        );
    }

    #[tokio::test]
    async fn read_error_stops_the_source_leg() {
        let mut reader = stream::iter(vec![Err::<UpstreamMessage, _>("connection reset")]);
        let mut sent: Vec<DownstreamMessage> = Vec::new();

        let stopped = pump::<UpstreamMessage, DownstreamMessage, _, _, _>(
            &mut reader,
            &mut sent,
            Direction::ToDownstream,
        )
        .await;

        assert_eq!(stopped.leg, Leg::Upstream);
        assert_eq!(stopped.end, LegEnd::Errored("connection reset".to_string()));
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn failed_write_stops_the_destination_leg() {
        let mut reader = stream::iter(vec![
            Ok::<_, Infallible>(DownstreamMessage::Text("one".into())),
            Ok(DownstreamMessage::Text("two".into())),
        ]);
        let mut writer = Box::pin(futures_util::sink::unfold(
            (),
            |(), _message: UpstreamMessage| async { Err::<(), _>("peer gone") },
        ));

        let stopped = pump::<DownstreamMessage, UpstreamMessage, _, _, _>(
            &mut reader,
            &mut writer,
            Direction::ToUpstream,
        )
        .await;

        assert_eq!(
            stopped,
            Stopped {
                leg: Leg::Upstream,
                end: LegEnd::Errored("peer gone".to_string()),
            }
        );
    }

    #[test]
    fn reserved_codes_are_not_sendable() {
        assert!(CloseNotice::normal().is_sendable());
        assert!(CloseNotice::new(4000, "").is_sendable());
        assert!(!CloseNotice::new(1005, "").is_sendable());
        assert!(!CloseNotice::new(1006, "").is_sendable());
        assert!(!CloseNotice::new(1015, "").is_sendable());
    }

    #[test]
    fn close_notice_display() {
        assert_eq!(CloseNotice::normal().to_string(), "1000");
        assert_eq!(
            CloseNotice::new(CLOSE_INTERNAL_ERROR, "upstream error").to_string(),
            "1011 (upstream error)"
        );
    }
}
