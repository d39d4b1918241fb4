//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check that fingerprint aliases parse as JA3 strings
//! - Check that the default profile exists
//!
//! Returns all validation errors, not just the first.

use thiserror::Error;

use crate::config::schema::BridgeConfig;
use crate::fingerprint::Ja3;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.channel.host.is_empty() {
        errors.push(ValidationError::new("channel.host", "must not be empty"));
    }
    if config.channel.port == 0 {
        errors.push(ValidationError::new("channel.port", "must be non-zero"));
    }
    if !config.channel.path.starts_with('/') {
        errors.push(ValidationError::new("channel.path", "must start with '/'"));
    }
    if config.channel.dial_timeout_secs == 0 {
        errors.push(ValidationError::new("channel.dial_timeout_secs", "must be greater than 0"));
    }

    if config.reconnect.base_delay_ms == 0 {
        errors.push(ValidationError::new("reconnect.base_delay_ms", "must be greater than 0"));
    }
    if config.reconnect.max_delay_ms < config.reconnect.base_delay_ms {
        errors.push(ValidationError::new(
            "reconnect.max_delay_ms",
            "must be at least reconnect.base_delay_ms",
        ));
    }

    if config.dispatcher.max_concurrency == 0 {
        errors.push(ValidationError::new("dispatcher.max_concurrency", "must be greater than 0"));
    }

    if config.executor.request_timeout_secs == 0 {
        errors.push(ValidationError::new("executor.request_timeout_secs", "must be greater than 0"));
    }
    if config.executor.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("executor.connect_timeout_secs", "must be greater than 0"));
    }
    if config.executor.max_body_bytes == 0 {
        errors.push(ValidationError::new("executor.max_body_bytes", "must be greater than 0"));
    }

    let mut aliases: Vec<_> = config.fingerprints.profiles.iter().collect();
    aliases.sort_by(|a, b| a.0.cmp(b.0));
    for (name, ja3) in aliases {
        if let Err(e) = ja3.parse::<Ja3>() {
            errors.push(ValidationError::new(format!("fingerprints.profiles.{}", name), e));
        }
    }

    if let Some(default) = &config.fingerprints.default {
        if !config.fingerprints.profiles.contains_key(default) && default.parse::<Ja3>().is_err() {
            errors.push(ValidationError::new(
                "fingerprints.default",
                format!("'{}' is neither a profile name nor a JA3 string", default),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
