//! Fingerprinted HTTP request bridge.
//!
//! A controlling application sends request descriptions over a WebSocket
//! control channel; the bridge executes each one concurrently with the TLS
//! profile named by its fingerprint and streams back the response or a
//! typed error.

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::schema::BridgeConfig;
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use lifecycle::Shutdown;
pub use net::Server;
