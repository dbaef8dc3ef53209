//! Public stream types

use crate::media::{CodecCapability, MediaStream, TrackKind};
use serde::{Deserialize, Serialize};
use streamrtc_signaling::{MediaType, StreamId, StreamMetadata};

/// A published or subscribed stream as seen by the application
#[derive(Debug, Clone)]
pub struct RtcStream {
    pub endpoint_id: String,
    pub media_types: Vec<MediaType>,
    pub alias: Option<String>,
    pub participant_id: Option<String>,
    pub media_stream: MediaStream,
}

impl RtcStream {
    /// Describe a subscribed stream from whatever metadata the platform sent
    ///
    /// The stream id stands in for the endpoint id. Media kinds fall back to
    /// the kinds of the stream's tracks when no metadata is known.
    pub fn subscribed(media_stream: MediaStream, metadata: Option<&StreamMetadata>) -> Self {
        let media_types = match metadata {
            Some(meta) if !meta.media_types.is_empty() => meta.media_types.clone(),
            _ => media_stream.media_types(),
        };
        Self {
            endpoint_id: media_stream.id().to_string(),
            media_types,
            alias: metadata.and_then(|meta| meta.alias.clone()),
            participant_id: metadata.and_then(|meta| meta.participant_id.clone()),
            media_stream,
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        self.media_stream.id()
    }
}

/// Preferred codec order per media kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<CodecCapability>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Vec<CodecCapability>>,
}

impl CodecPreferences {
    pub fn for_kind(&self, kind: TrackKind) -> &[CodecCapability] {
        let list = match kind {
            TrackKind::Audio => &self.audio,
            TrackKind::Video => &self.video,
        };
        list.as_deref().unwrap_or(&[])
    }
}

/// Options for `publish`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Tag carried into subscription events and billing records; not for PII
    pub alias: Option<String>,
    pub codec_preferences: Option<CodecPreferences>,
}

impl PublishOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_codec_preferences(mut self, preferences: CodecPreferences) -> Self {
        self.codec_preferences = Some(preferences);
        self
    }
}

/// Names a published stream for `unpublish` and the enable toggles
#[derive(Debug, Clone)]
pub enum StreamRef {
    Id(StreamId),
    Stream(RtcStream),
}

impl StreamRef {
    pub fn stream_id(&self) -> &StreamId {
        match self {
            StreamRef::Id(id) => id,
            StreamRef::Stream(stream) => stream.stream_id(),
        }
    }
}

impl From<StreamId> for StreamRef {
    fn from(id: StreamId) -> Self {
        StreamRef::Id(id)
    }
}

impl From<&str> for StreamRef {
    fn from(id: &str) -> Self {
        StreamRef::Id(StreamId::new(id))
    }
}

impl From<RtcStream> for StreamRef {
    fn from(stream: RtcStream) -> Self {
        StreamRef::Stream(stream)
    }
}

impl From<&RtcStream> for StreamRef {
    fn from(stream: &RtcStream) -> Self {
        StreamRef::Stream(stream.clone())
    }
}
