//! Control channel subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket text/binary frame
//!     → frame.rs decode_request (malformed frames are logged and dropped)
//!     → session.rs submit to the session's dispatcher
//!     → completion → frame.rs encode_completion → writer task → WebSocket
//! ```
//!
//! # Design Decisions
//! - A single writer task owns the sink; outbound frames never interleave
//! - The outbound queue is unbounded so completions are never dropped
//! - Session teardown cancels in-flight requests before closing the sink

pub mod frame;
pub mod session;

pub use frame::{decode_request, encode_completion};
pub use session::{ChannelSession, SessionEnd};
