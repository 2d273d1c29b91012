//! Per-leg lifecycle state machine.
//!
//! # States
//! ```text
//! Connecting → Open → Closing → Closed
//!      │         │
//!      └─────────┴──(error)──→ Closing
//! ```
//!
//! An errored leg is never parked: the error event lands it in `Closing`
//! straight away, so the session always heads towards `Closed`.

use std::fmt;

/// Which side of a session a leg faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    /// The accepted client connection.
    Downstream,
    /// The connection the bridge dialled to the realtime service.
    Upstream,
}

impl Leg {
    /// The opposite leg of the same session.
    pub fn peer(self) -> Self {
        match self {
            Leg::Downstream => Leg::Upstream,
            Leg::Upstream => Leg::Downstream,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Leg::Downstream => "downstream",
            Leg::Upstream => "upstream",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Something that happened to a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegEvent {
    /// Handshake completed.
    Opened,
    /// Transport error on the leg.
    Errored,
    /// Close initiated, by either end.
    CloseStarted,
    /// Transport released.
    Closed,
}

impl LegState {
    /// Apply an event, returning the next state. Events that make no sense
    /// in the current state leave it unchanged.
    pub fn on(self, event: LegEvent) -> Self {
        use LegState::{Closing, Connecting, Open};

        match (self, event) {
            (Connecting, LegEvent::Opened) => Open,
            (Connecting | Open, LegEvent::Errored) => Closing,
            (Connecting | Open, LegEvent::CloseStarted) => Closing,
            (_, LegEvent::Closed) => LegState::Closed,
            (state, _) => state,
        }
    }

    /// True while a close still has to be driven on this leg.
    pub fn needs_close(self) -> bool {
        matches!(self, LegState::Connecting | LegState::Open)
    }
}

/// Both legs of one session.
#[derive(Debug, Clone, Copy)]
pub struct LegPair {
    downstream: LegState,
    upstream: LegState,
}

impl LegPair {
    /// A freshly accepted session: the client leg is already open, the
    /// upstream leg has not been dialled yet.
    pub fn accepted() -> Self {
        Self {
            downstream: LegState::Open,
            upstream: LegState::Connecting,
        }
    }

    pub fn get(&self, leg: Leg) -> LegState {
        match leg {
            Leg::Downstream => self.downstream,
            Leg::Upstream => self.upstream,
        }
    }

    /// Record an event on a leg and return its new state.
    pub fn apply(&mut self, leg: Leg, event: LegEvent) -> LegState {
        let slot = match leg {
            Leg::Downstream => &mut self.downstream,
            Leg::Upstream => &mut self.upstream,
        };
        let next = slot.on(event);
        if next != *slot {
            tracing::trace!(%leg, from = ?*slot, to = ?next, "Leg state changed");
        }
        *slot = next;
        next
    }

    /// Both legs are fully closed; the session can be dropped.
    pub fn is_finished(&self) -> bool {
        self.downstream == LegState::Closed && self.upstream == LegState::Closed
    }
}
