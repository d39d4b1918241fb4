//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{BridgeConfig, WS_PORT_ENV};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid override: {0}")]
    Override(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<BridgeConfig, ConfigError> {
    let config: BridgeConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `WS_PORT` and an optional `--addr` value, then validate again.
pub fn apply_overrides(config: BridgeConfig, addr: Option<&str>) -> Result<BridgeConfig, ConfigError> {
    override_with(config, std::env::var(WS_PORT_ENV).ok(), addr)
}

fn override_with(
    mut config: BridgeConfig,
    port: Option<String>,
    addr: Option<&str>,
) -> Result<BridgeConfig, ConfigError> {
    config.apply_port_override(port);
    if let Some(addr) = addr {
        config.channel.set_address(addr).map_err(ConfigError::Override)?;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let config = parse_config(
            r#"
            [channel]
            host = "127.0.0.1"
            port = 9200

            [executor]
            max_body_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.channel.endpoint(), "ws://127.0.0.1:9200/");
        assert_eq!(config.executor.max_body_bytes, 4096);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = parse_config("[executor]\nrequest_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("executor.request_timeout_secs"));
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let err = parse_config("[channel\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides_are_validated() {
        let config = override_with(BridgeConfig::default(), Some("7000".into()), None).unwrap();
        assert_eq!(config.channel.port, 7000);

        let config = override_with(config, None, Some("10.0.0.5:8000")).unwrap();
        assert_eq!(config.channel.endpoint(), "ws://10.0.0.5:8000/");

        let err = override_with(BridgeConfig::default(), None, Some("host:0")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("channel.port"));

        let err = override_with(BridgeConfig::default(), None, Some("no-port")).unwrap_err();
        assert!(matches!(err, ConfigError::Override(_)));

        let err = override_with(BridgeConfig::default(), Some("0".into()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/ja3-bridge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
