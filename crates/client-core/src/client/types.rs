//! Client-facing input types

use streamrtc_session_core::{MediaStream, MediaStreamConstraints};

/// What to publish: capture constraints resolved through the configured
/// media devices, or a stream the application already holds
#[derive(Debug, Clone)]
pub enum PublishInput {
    Constraints(MediaStreamConstraints),
    Stream(MediaStream),
}

impl Default for PublishInput {
    /// Capture audio and video
    fn default() -> Self {
        PublishInput::Constraints(MediaStreamConstraints::default())
    }
}

impl From<MediaStreamConstraints> for PublishInput {
    fn from(constraints: MediaStreamConstraints) -> Self {
        PublishInput::Constraints(constraints)
    }
}

impl From<MediaStream> for PublishInput {
    fn from(stream: MediaStream) -> Self {
        PublishInput::Stream(stream)
    }
}
