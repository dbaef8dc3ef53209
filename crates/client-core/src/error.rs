//! Error types for the client layer

use streamrtc_session_core::{MediaError, SessionError};
use streamrtc_signaling::SignalingError;
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to applications
#[derive(Error, Debug)]
pub enum ClientError {
    /// Negotiation with the platform failed
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The signaling connection failed
    #[error("Signaling error: {0}")]
    Signaling(#[from] SignalingError),

    /// Capture devices could not be opened
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Logging or configuration file handling failed
    #[error("Infrastructure error: {0}")]
    Infra(#[from] streamrtc_infra_common::Error),

    /// A required collaborator or setting is missing
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// A configuration value is out of range
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

impl ClientError {
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same operation could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::Session(e) => e.is_recoverable(),
            ClientError::Signaling(e) => e.is_recoverable(),
            ClientError::Media(MediaError::DeviceUnavailable(_)) => true,
            ClientError::Media(_)
            | ClientError::Infra(_)
            | ClientError::InvalidConfiguration { .. }
            | ClientError::Config { .. } => false,
        }
    }

    /// Coarse error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ClientError::Session(e) => e.category(),
            ClientError::Signaling(e) => e.category(),
            ClientError::Media(_) => "media",
            ClientError::Infra(_) => "infrastructure",
            ClientError::InvalidConfiguration { .. } | ClientError::Config { .. } => "configuration",
        }
    }
}
