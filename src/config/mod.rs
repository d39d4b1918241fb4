//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → environment / CLI overrides (WS_PORT, --addr)
//!     → BridgeConfig (validated, immutable)
//!     → shared by value with every subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults, so running without a file is valid
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_overrides, load_config, ConfigError};
pub use schema::BridgeConfig;
pub use schema::ChannelConfig;
pub use schema::DispatcherConfig;
pub use schema::ExecutorConfig;
pub use schema::FingerprintConfig;
pub use schema::ObservabilityConfig;
pub use schema::ReconnectConfig;
