//! Session identity and state tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Track session state (Connecting → Open → Closing → Closed)

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Global atomic counter for session IDs.
/// Relaxed ordering is enough, only uniqueness matters.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a control channel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle state of a control channel session.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the channel handshake.
    Connecting = 0,
    /// Receiving frames and dispatching requests.
    Open = 1,
    /// Cancelling in-flight requests and flushing the writer.
    Closing = 2,
    /// Fully torn down.
    Closed = 3,
}

impl From<u8> for SessionState {
    fn from(val: u8) -> Self {
        match val {
            1 => SessionState::Open,
            2 => SessionState::Closing,
            3 => SessionState::Closed,
            _ => SessionState::Connecting,
        }
    }
}

/// Shared, lock-free holder of a session state.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> SessionState {
        SessionState::from(self.0.load(Ordering::SeqCst))
    }

    /// Move to `next`, returning the previous state.
    pub fn set(&self, next: SessionState) -> SessionState {
        SessionState::from(self.0.swap(next as u8, Ordering::SeqCst))
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(SessionState::Connecting)
    }
}
