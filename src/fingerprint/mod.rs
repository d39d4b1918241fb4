//! Fingerprint profile subsystem.
//!
//! # Data Flow
//! ```text
//! request "ja3" field (identifier)
//!     → cache.rs (single-flight lookup by identifier)
//!     → cache.rs Ja3ProfileBuilder (alias / default resolution)
//!     → ja3.rs (parse descriptor)
//!     → transport.rs (configured HTTP client, proxied variants)
//! ```
//!
//! # Design Decisions
//! - The ClientHello byte layout is owned by the TLS backend; a profile only
//!   selects backend, version bounds and ALPN
//! - Profiles live for the whole process, there is no eviction
//! - Builders are pluggable through the `ProfileBuilder` trait

pub mod cache;
pub mod ja3;
pub mod transport;

pub use cache::{Ja3ProfileBuilder, ProfileBuilder, ProfileCache};
pub use ja3::Ja3;
pub use transport::Transport;
