//! Request execution subsystem.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor (request.rs)
//!     → client.rs (proxy check, fingerprint transport, send with deadline)
//!     → response.rs (header folding)
//!     → ResponseDescriptor | BridgeError
//! ```

pub mod client;
pub mod request;
pub mod response;

pub use client::RequestExecutor;
pub use request::RequestDescriptor;
pub use response::{ErrorNotification, ResponseDescriptor};
