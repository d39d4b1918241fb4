//! Request scheduling subsystem.
//!
//! # Data Flow
//! ```text
//! ChannelSession
//!     → dispatcher.rs submit (id uniqueness, in-flight entry)
//!     → spawned task (semaphore permit → RequestExecutor)
//!     → entry removed → completion callback → ChannelSession writer
//! ```
//!
//! # Design Decisions
//! - One task per request; a slow upstream never blocks the others
//! - Concurrency is bounded process-wide by one semaphore
//! - Completions carry no ordering guarantee

pub mod dispatcher;

pub use dispatcher::{Completion, RequestDispatcher};
