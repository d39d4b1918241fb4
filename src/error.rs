//! Error types shared by every stage of request processing.

use serde::Serialize;
use thiserror::Error;

/// Wire-level classification of a failure, sent back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnknownFingerprint,
    InvalidProxy,
    NetworkError,
    Timeout,
    DuplicateRequestId,
    MalformedFrame,
    BodyTooLarge,
    ChannelClosed,
    Config,
}

impl ErrorKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownFingerprint => "unknown_fingerprint",
            ErrorKind::InvalidProxy => "invalid_proxy",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DuplicateRequestId => "duplicate_request_id",
            ErrorKind::MalformedFrame => "malformed_frame",
            ErrorKind::BodyTooLarge => "body_too_large",
            ErrorKind::ChannelClosed => "channel_closed",
            ErrorKind::Config => "config",
        }
    }
}

/// Errors raised while bridging requests.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The fingerprint identifier is neither a known alias nor a valid JA3 string.
    #[error("unknown fingerprint '{0}'")]
    UnknownFingerprint(String),

    /// The proxy field could not be parsed or uses an unsupported scheme.
    #[error("invalid proxy '{proxy}': {reason}")]
    InvalidProxy { proxy: String, reason: String },

    /// Connect, TLS or HTTP failure talking to the upstream.
    #[error("network error: {0}")]
    Network(String),

    /// The per-request deadline elapsed.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// A request with the same id is still in flight on this session.
    #[error("request id '{0}' is already in flight")]
    DuplicateRequestId(String),

    /// An inbound frame could not be decoded.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The upstream response body exceeded the configured limit.
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The control channel is gone.
    #[error("control channel closed: {0}")]
    ChannelClosed(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::UnknownFingerprint(_) => ErrorKind::UnknownFingerprint,
            BridgeError::InvalidProxy { .. } => ErrorKind::InvalidProxy,
            BridgeError::Network(_) => ErrorKind::NetworkError,
            BridgeError::Timeout(_) => ErrorKind::Timeout,
            BridgeError::DuplicateRequestId(_) => ErrorKind::DuplicateRequestId,
            BridgeError::MalformedFrame(_) => ErrorKind::MalformedFrame,
            BridgeError::BodyTooLarge { .. } => ErrorKind::BodyTooLarge,
            BridgeError::ChannelClosed(_) => ErrorKind::ChannelClosed,
            BridgeError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display hides the source chain, which is where TLS and
        // connect failures put the useful detail.
        let mut detail = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        BridgeError::Network(detail)
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
