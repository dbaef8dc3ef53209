//! Local and remote media handles

use crate::errors::MediaResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use streamrtc_signaling::{MediaType, StreamId};

/// Identity of a single media track
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

impl From<TrackKind> for MediaType {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Audio => MediaType::Audio,
            TrackKind::Video => MediaType::Video,
        }
    }
}

/// A capture or receive track provided by the media capability
pub trait MediaTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> TrackId;

    fn kind(&self) -> TrackKind;

    fn enabled(&self) -> bool;

    /// Mute or unmute the track without renegotiating
    fn set_enabled(&self, enabled: bool);

    /// Release the underlying source
    fn stop(&self);
}

/// A bundle of tracks sharing one stream identity (msid)
///
/// Remote handles carry the full negotiated track set, which the
/// reconciler compares against the tracks that actually arrived.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: StreamId,
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(id: impl Into<StreamId>, tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn tracks_of_kind(&self, kind: TrackKind) -> impl Iterator<Item = &Arc<dyn MediaTrack>> + '_ {
        self.tracks.iter().filter(move |track| track.kind() == kind)
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|track| track.id()).collect()
    }

    /// Media kinds present in the stream, audio first
    pub fn media_types(&self) -> Vec<MediaType> {
        let mut types = Vec::new();
        for kind in [TrackKind::Audio, TrackKind::Video] {
            if self.tracks.iter().any(|track| track.kind() == kind) {
                types.push(kind.into());
            }
        }
        types
    }
}

/// What to capture when publishing from devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaStreamConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaStreamConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl MediaStreamConstraints {
    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: false,
        }
    }
}

/// Capture device access
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(&self, constraints: &MediaStreamConstraints) -> MediaResult<MediaStream>;
}
