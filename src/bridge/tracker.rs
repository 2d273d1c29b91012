//! Session identity and live-session accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::observability::metrics;

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0.simple())
    }
}

/// Counts sessions still running, for shutdown draining.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active_count: Arc<AtomicU64>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session. Returns a guard that decrements on drop.
    pub fn track(&self) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::record_session_opened();
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every session has ended, or `deadline` passes. Returns
    /// the number of sessions still running.
    pub async fn drain(&self, deadline: Duration) -> u64 {
        let wait = async {
            while self.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        let _ = tokio::time::timeout(deadline, wait).await;
        self.active_count()
    }
}

/// Guard that tracks a session's lifetime.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    id: SessionId,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::record_session_closed();
        tracing::trace!(session_id = %self.id, "Session released");
    }
}
