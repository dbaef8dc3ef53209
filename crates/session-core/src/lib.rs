//! # streamrtc-session-core
//!
//! Session negotiation for the streamrtc SDK.
//!
//! A streamrtc endpoint holds two peer sessions with the platform:
//!
//! - a **publishing** session carrying local media upstream, where we offer
//!   and the platform answers through `offerSdp`
//! - a **subscribing** session carrying remote media downstream, where the
//!   platform pushes revisioned offers and we answer through `answerSdp`
//!
//! [`SessionNegotiator`] serializes the rounds of each session, keeps the
//! published and subscribed registries in step with them, and reports remote
//! streams to a [`StreamEventHandler`] once every track of a stream has
//! arrived (and again once every track has ended).
//!
//! The media stack itself sits behind the traits in [`media`], so the crate
//! can be driven by any WebRTC implementation or by test doubles.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamrtc_session_core::{
//!     MediaStream, NegotiatorConfig, PeerConnectionFactory, PublishOptions, SessionNegotiator,
//! };
//! use streamrtc_signaling::SdpSignaling;
//!
//! # async fn example(
//! #     signaling: Arc<dyn SdpSignaling>,
//! #     factory: Arc<dyn PeerConnectionFactory>,
//! #     camera: MediaStream,
//! # ) -> streamrtc_session_core::Result<()> {
//! let negotiator = SessionNegotiator::new(signaling, factory, NegotiatorConfig::default());
//! let published = negotiator
//!     .publish(camera, PublishOptions::new().with_alias("cam1"))
//!     .await?;
//! println!("publishing as endpoint {}", published.endpoint_id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod events;
pub mod media;
pub mod negotiator;
pub mod reconcile;
pub mod registry;
pub mod sdp;
pub mod types;

pub use config::{
    BundlePolicy, IceServer, IceTransportPolicy, NegotiatorConfig, RtcConfiguration,
    RtcpMuxPolicy,
};
pub use errors::{MediaError, MediaResult, Result, SessionError};
pub use events::{PeerDirection, SessionEvent, StreamEventHandler};
pub use media::{
    CodecCapability, DataChannel, DataChannelInit, IceConnectionState, MediaDevices, MediaStream,
    MediaStreamConstraints, MediaTrack, PeerConnection, PeerConnectionFactory,
    PeerConnectionState, PeerEvent, RtpTransceiver, SessionDescription, TrackId, TrackKind,
};
pub use negotiator::{
    DIAGNOSTICS_CHANNEL_LABEL, HEARTBEAT_CHANNEL_LABEL, OfferDisposition, SessionNegotiator,
};
pub use reconcile::{ReconcileEvent, StreamPhase, StreamReconciler};
pub use registry::{PublishedRegistry, PublishedStream, SubscribedRegistry};
pub use sdp::SetupRole;
pub use types::{CodecPreferences, PublishOptions, RtcStream, StreamRef};
