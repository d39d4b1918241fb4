//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the control channel port.
pub const WS_PORT_ENV: &str = "WS_PORT";

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Control channel endpoint.
    pub channel: ChannelConfig,

    /// Reconnection policy for the control channel.
    pub reconnect: ReconnectConfig,

    /// Concurrency limits for in-flight requests.
    pub dispatcher: DispatcherConfig,

    /// Upstream request settings.
    pub executor: ExecutorConfig,

    /// Named fingerprint profiles.
    pub fingerprints: FingerprintConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl BridgeConfig {
    /// Override the channel port from a raw `WS_PORT` value.
    pub(crate) fn apply_port_override(&mut self, port: Option<String>) {
        let Some(raw) = port else { return };
        match raw.trim().parse::<u16>() {
            Ok(port) => self.channel.port = port,
            Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid {}", WS_PORT_ENV),
        }
    }
}

/// Control channel endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Host of the controlling application.
    pub host: String,

    /// Port of the controlling application.
    pub port: u16,

    /// Request path of the WebSocket endpoint.
    pub path: String,

    /// Time allowed for one dial plus WebSocket handshake in seconds.
    pub dial_timeout_secs: u64,
}

impl ChannelConfig {
    /// WebSocket URL of the control endpoint.
    pub fn endpoint(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Replace host and port from a `host:port` string.
    pub fn set_address(&mut self, addr: &str) -> Result<(), String> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| format!("address '{}' is not host:port", addr))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid port in '{}': {}", addr, e))?;
        self.host = host.to_string();
        self.port = port;
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9119,
            path: "/".to_string(),
            dial_timeout_secs: 10,
        }
    }
}

/// Reconnection backoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Consecutive failed dials before giving up (0 = never give up).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 250,
            max_delay_ms: 30_000,
            max_attempts: 0,
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum concurrently executing upstream requests.
    pub max_concurrency: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { max_concurrency: 256 }
    }
}

/// Upstream request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Total time allowed for one request/response exchange in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum response body size in bytes.
    pub max_body_bytes: usize,
}

impl ExecutorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_body_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Fingerprint profile configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Profile used when a request carries an empty fingerprint.
    pub default: Option<String>,

    /// Alias name -> JA3 string.
    pub profiles: HashMap<String, String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9190".to_string(),
        }
    }
}
