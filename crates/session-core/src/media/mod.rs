//! Media capability interface
//!
//! Everything the negotiator needs from the underlying media stack: capture,
//! tracks, and peer connections. Implementations live outside this crate.

pub mod peer;
pub mod track;

pub use peer::{
    CodecCapability, DataChannel, DataChannelInit, IceConnectionState, IceGatheringState,
    OfferOptions, PeerConnection, PeerConnectionFactory, PeerConnectionState, PeerEvent,
    RtpTransceiver, SdpType, SessionDescription, SignalingState, TransceiverDirection,
    TransceiverInit,
};
pub use track::{MediaDevices, MediaStream, MediaStreamConstraints, MediaTrack, TrackId, TrackKind};
