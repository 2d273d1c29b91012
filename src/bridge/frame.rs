//! Transport-neutral frame model and framing normalization.
//!
//! The downstream leg speaks axum's WebSocket message type, the upstream leg
//! speaks tungstenite's. A [`Frame`] carries only what the bridge relays:
//! the payload bytes and whether they were framed as text or binary.
//! Control frames (ping, pong, close) never become frames.

use axum::body::Bytes;
use axum::extract::ws::Message as DownstreamMessage;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

/// Framing kind of a relayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

/// A single data message in flight through a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
    pub kind: FrameKind,
}

impl Frame {
    /// A text-framed message whose payload may still be raw bytes.
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            kind: FrameKind::Text,
        }
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            kind: FrameKind::Binary,
        }
    }

    /// Decode the payload as UTF-8. Invalid sequences become U+FFFD rather
    /// than failing the frame.
    pub fn decode_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Extract the data frame from a downstream message.
    pub fn from_downstream(message: DownstreamMessage) -> Option<Self> {
        match message {
            DownstreamMessage::Text(text) => {
                Some(Self::text(Bytes::copy_from_slice(text.as_str().as_bytes())))
            }
            DownstreamMessage::Binary(data) => Some(Self::binary(data)),
            _ => None,
        }
    }

    /// Extract the data frame from an upstream message.
    pub fn from_upstream(message: UpstreamMessage) -> Option<Self> {
        match message {
            UpstreamMessage::Text(text) => {
                Some(Self::text(Bytes::copy_from_slice(text.as_str().as_bytes())))
            }
            UpstreamMessage::Binary(data) => Some(Self::binary(data)),
            _ => None,
        }
    }

    /// Re-frame for the upstream leg with the same payload and kind.
    pub fn into_upstream(self) -> UpstreamMessage {
        match self.kind {
            FrameKind::Text => UpstreamMessage::text(self.decode_text()),
            FrameKind::Binary => UpstreamMessage::Binary(self.payload),
        }
    }

    /// Re-frame for the downstream leg.
    ///
    /// Text-kind frames are always delivered as a text message carrying the
    /// UTF-8 decoding of the payload, whatever the payload's representation
    /// was upstream. Binary frames pass through untouched.
    pub fn into_downstream(self) -> DownstreamMessage {
        match self.kind {
            FrameKind::Text => DownstreamMessage::Text(self.decode_text().into()),
            FrameKind::Binary => DownstreamMessage::Binary(self.payload),
        }
    }
}
