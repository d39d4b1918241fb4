//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs dials ws://host:port/path
//!     → connection.rs (session id, state tracking)
//!     → channel::ChannelSession serves the socket
//!     → on loss: backoff, redial
//!
//! Session States:
//!     Connecting → Open → Closing → Closed
//! ```
//!
//! # Design Decisions
//! - The bridge is the WebSocket client; the controller is the server
//! - At most one session is live at a time
//! - Concurrency permits are shared across sessions

pub mod connection;
pub mod server;

pub use connection::{SessionId, SessionState};
pub use server::Server;
