//! Error types for the signaling client
//!
//! Errors are grouped so callers can decide whether re-invoking the same
//! operation makes sense:
//!
//! - **State errors** - operation called in the wrong connection state
//! - **Transport errors** - the channel failed or closed underneath a call
//! - **Protocol errors** - the platform rejected a call or answered with
//!   something that does not decode

use thiserror::Error;

/// Result type for signaling operations
pub type Result<T> = std::result::Result<T, SignalingError>;

/// Errors that can occur while talking to the platform
#[derive(Error, Debug, Clone)]
pub enum SignalingError {
    /// An operation needed an open connection
    #[error("Signaling channel is not connected")]
    NotConnected,

    /// `connect` was called on a client that already has a connection
    #[error("Signaling channel is already connected")]
    AlreadyConnected,

    /// The channel could not be opened or initialized
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// The platform answered a call with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The underlying transport failed
    #[error("Transport failed: {reason}")]
    Transport { reason: String },

    /// The channel closed while a call was in flight
    #[error("Signaling channel closed")]
    ChannelClosed,

    /// A response arrived but could not be decoded
    #[error("Malformed response to '{method}': {reason}")]
    MalformedResponse { method: String, reason: String },

    /// The configured platform URL is invalid
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A message could not be encoded or decoded
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for SignalingError {
    fn from(err: serde_json::Error) -> Self {
        SignalingError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl SignalingError {
    /// Create a connection failure
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Create a transport failure
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create a malformed-response error for `method`
    pub fn malformed(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Whether re-invoking the failed operation could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            SignalingError::Transport { .. }
            | SignalingError::ChannelClosed
            | SignalingError::ConnectionFailed { .. } => true,

            SignalingError::NotConnected
            | SignalingError::AlreadyConnected
            | SignalingError::InvalidUrl(_)
            | SignalingError::Serialization { .. }
            | SignalingError::MalformedResponse { .. } => false,

            SignalingError::Rpc { .. } => false,
        }
    }

    /// Coarse error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SignalingError::NotConnected | SignalingError::AlreadyConnected => "state",
            SignalingError::ConnectionFailed { .. }
            | SignalingError::Transport { .. }
            | SignalingError::ChannelClosed => "network",
            SignalingError::Rpc { .. } | SignalingError::MalformedResponse { .. } => "protocol",
            SignalingError::InvalidUrl(_) | SignalingError::Serialization { .. } => "encoding",
        }
    }
}
