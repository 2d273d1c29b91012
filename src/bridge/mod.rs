//! Session bridge subsystem.
//!
//! # Data Flow
//! ```text
//! accepted client socket
//!     → session.rs (dial upstream with credential, pair the legs)
//!     → forward.rs (two one-way pumps, framing per frame.rs)
//!     → state.rs (per-leg lifecycle, drives teardown)
//!     → both legs closed, session dropped
//!
//!  Client ←── text / binary ──→ Bridge ←── text / binary ──→ Realtime API
//!                                  │
//!                          Authorization: Bearer <credential>
//! ```
//!
//! # Design Decisions
//! - Sessions share nothing but the read-only credential and endpoint
//! - Frames that cannot be delivered because a leg is not open are dropped
//! - Upstream text frames always reach the client as text strings
//! - Either leg stopping tears the whole session down

pub mod error;
pub mod forward;
pub mod frame;
pub mod session;
pub mod state;
pub mod tracker;
pub mod upstream;

pub use error::{BridgeError, BridgeResult};
pub use forward::{CloseNotice, Direction, LegEnd, Stopped};
pub use frame::{Frame, FrameKind};
pub use session::Bridge;
pub use state::{Leg, LegEvent, LegPair, LegState};
pub use tracker::{SessionId, SessionTracker};
