//! Wire types exchanged with the platform
//!
//! Field names follow the platform's camelCase JSON. Stream metadata maps are
//! keyed by [`StreamId`], the msid that joins platform metadata to locally
//! observed media.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Opaque identity of a local or remote media stream (msid)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub String);

impl StreamId {
    /// Create a stream id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of media carried by a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Audio,
    Video,
    Application,
}

/// Platform-assigned description of a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    /// Endpoint that owns the stream
    pub endpoint_id: String,
    /// Kinds of media present in the stream
    #[serde(default)]
    pub media_types: Vec<MediaType>,
    /// Application-supplied alias, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Participant that owns the endpoint, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
}

/// Metadata sent for each locally published stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPublishMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Full publish metadata snapshot, ordered for stable encoding
pub type PublishMetadata = BTreeMap<StreamId, StreamPublishMetadata>;

/// Stream metadata keyed by msid, as delivered by the platform
pub type StreamMetadataMap = HashMap<StreamId, StreamMetadata>;

/// Parameters of the `offerSdp` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferSdpRequest {
    pub sdp_offer: String,
    pub media_metadata: PublishMetadata,
}

/// Result of the `offerSdp` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSdpAnswer {
    pub sdp_answer: String,
    pub endpoint_id: String,
    #[serde(default)]
    pub stream_metadata: StreamMetadataMap,
}

/// Revision-numbered offer pushed by the platform for the subscribing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeSdpOffer {
    pub sdp_offer: String,
    pub sdp_revision: u64,
    pub endpoint_id: String,
    #[serde(default)]
    pub stream_metadata: StreamMetadataMap,
}

/// Parameters of the `answerSdp` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSdpRequest {
    pub sdp_answer: String,
}

/// Parameters of the `setMediaPreferences` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPreferences {
    pub protocol: String,
}

impl Default for MediaPreferences {
    fn default() -> Self {
        Self {
            protocol: "WEBRTC".to_string(),
        }
    }
}

/// Credentials used to open the signaling channel
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthParams {
    /// Device token (JWT) issued by the application server
    pub device_token: String,
}

impl AuthParams {
    pub fn new(device_token: impl Into<String>) -> Self {
        Self {
            device_token: device_token.into(),
        }
    }
}

impl fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthParams")
            .field("device_token", &"<redacted>")
            .finish()
    }
}
