//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Control channel dial fails or session drops:
//!     → backoff.rs (delay before the next dial attempt)
//!     → net::server redials until connected, shutdown, or attempts exhausted
//! ```
//!
//! # Design Decisions
//! - Exponential growth capped at a maximum, plus up to 10% jitter
//! - Attempt counter resets after every successful connection

pub mod backoff;

pub use backoff::calculate_backoff;
