//! Error types for session negotiation

use streamrtc_signaling::SignalingError;
use thiserror::Error;

/// Result type for negotiator operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Result type for media capability calls
pub type MediaResult<T> = std::result::Result<T, MediaError>;

/// Failure reported by the media capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Capture devices could not be opened
    #[error("Media device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A peer connection operation failed
    #[error("{operation} failed: {reason}")]
    OperationFailed { operation: String, reason: String },

    /// The peer connection is already closed
    #[error("Peer connection is closed")]
    Closed,
}

impl MediaError {
    pub fn failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the session negotiator
#[derive(Error, Debug)]
pub enum SessionError {
    /// A mutation was attempted while the signaling channel is down
    #[error("Not connected to the platform")]
    NotConnected,

    /// The media capability failed during offer/answer creation or application
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// The platform call failed
    #[error("Signaling error: {0}")]
    Signaling(#[from] SignalingError),

    /// The platform answered without a usable SDP
    #[error("No usable SDP answer: {context}")]
    MissingAnswer { context: String },

    /// A session description could not be processed
    #[error("Invalid SDP: {reason}")]
    InvalidSdp { reason: String },
}

impl SessionError {
    pub fn missing_answer(context: impl Into<String>) -> Self {
        Self::MissingAnswer {
            context: context.into(),
        }
    }

    pub fn invalid_sdp(reason: impl Into<String>) -> Self {
        Self::InvalidSdp {
            reason: reason.into(),
        }
    }

    /// Whether re-invoking the same operation could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::Signaling(e) => e.is_recoverable(),
            SessionError::Media(MediaError::OperationFailed { .. }) => true,
            SessionError::MissingAnswer { .. } => true,
            SessionError::NotConnected
            | SessionError::Media(_)
            | SessionError::InvalidSdp { .. } => false,
        }
    }

    /// Coarse error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SessionError::NotConnected => "precondition",
            SessionError::Media(_) => "media",
            SessionError::Signaling(_) => "transport",
            SessionError::MissingAnswer { .. } | SessionError::InvalidSdp { .. } => "negotiation",
        }
    }
}
