//! Peer connection capability
//!
//! The negotiator drives offer/answer through these traits and never looks
//! inside ICE, DTLS or codec negotiation. Implementations push state changes
//! and track lifecycle notifications on the event receiver returned by
//! [`PeerConnectionFactory::create_peer_connection`].

use super::track::{MediaStream, MediaTrack, TrackId};
use crate::config::RtcConfiguration;
use crate::errors::MediaResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use streamrtc_signaling::StreamId;
use tokio::sync::mpsc;

/// Offer or answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// A typed SDP blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Options for `create_offer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfferOptions {
    pub offer_to_receive_audio: bool,
    pub offer_to_receive_video: bool,
    pub voice_activity_detection: bool,
    pub ice_restart: bool,
}

impl OfferOptions {
    /// Offer that only sends media
    pub fn send_only(ice_restart: bool) -> Self {
        Self {
            offer_to_receive_audio: false,
            offer_to_receive_video: false,
            voice_activity_detection: true,
            ice_restart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransceiverDirection {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

/// One codec entry of a transceiver's preference list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecCapability {
    pub mime_type: String,
    pub clock_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_fmtp_line: Option<String>,
}

impl CodecCapability {
    pub fn new(mime_type: impl Into<String>, clock_rate: u32) -> Self {
        Self {
            mime_type: mime_type.into(),
            clock_rate,
            channels: None,
            sdp_fmtp_line: None,
        }
    }
}

/// How a track is attached to a peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransceiverInit {
    pub direction: TransceiverDirection,
    pub streams: Vec<StreamId>,
    /// Empty leaves the capability's default ordering in place
    pub codec_preferences: Vec<CodecCapability>,
}

#[async_trait]
pub trait RtpTransceiver: Send + Sync {
    /// Track currently attached to the sender, if any
    fn sender_track_id(&self) -> Option<TrackId>;

    /// Swap the sender's track; `None` detaches it
    async fn replace_sender_track(&self, track: Option<Arc<dyn MediaTrack>>) -> MediaResult<()>;

    fn stop(&self);
}

/// Options for opening a data channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChannelInit {
    pub id: Option<u16>,
    pub negotiated: bool,
    pub protocol: String,
}

pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;

    fn send_text(&self, message: &str) -> MediaResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceGatheringState {
    New,
    Gathering,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

/// Notifications pushed by a peer connection
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A remote track arrived, belonging to `streams`
    Track {
        track: Arc<dyn MediaTrack>,
        streams: Vec<MediaStream>,
    },
    TrackEnded { track_id: TrackId },
    TrackMuted { track_id: TrackId },
    TrackUnmuted { track_id: TrackId },
    ConnectionStateChanged(PeerConnectionState),
    IceConnectionStateChanged(IceConnectionState),
    IceGatheringStateChanged(IceGatheringState),
    SignalingStateChanged(SignalingState),
    NegotiationNeeded,
    /// A text message arrived on a data channel
    DataChannelMessage { label: String, message: String },
}

/// One media session with the platform
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self, options: &OfferOptions) -> MediaResult<SessionDescription>;

    async fn create_answer(&self) -> MediaResult<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> MediaResult<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> MediaResult<()>;

    fn add_transceiver(
        &self,
        track: Arc<dyn MediaTrack>,
        init: TransceiverInit,
    ) -> MediaResult<Arc<dyn RtpTransceiver>>;

    fn transceivers(&self) -> Vec<Arc<dyn RtpTransceiver>>;

    /// Detach the transceiver's sender from the connection
    fn remove_track(&self, transceiver: &Arc<dyn RtpTransceiver>) -> MediaResult<()>;

    fn create_data_channel(
        &self,
        label: &str,
        init: DataChannelInit,
    ) -> MediaResult<Arc<dyn DataChannel>>;

    fn connection_state(&self) -> PeerConnectionState;

    async fn close(&self);
}

/// Creates peer connections together with their event receivers
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create_peer_connection(
        &self,
        config: &RtcConfiguration,
    ) -> MediaResult<(Arc<dyn PeerConnection>, mpsc::Receiver<PeerEvent>)>;
}
