//! # streamrtc-signaling
//!
//! JSON-RPC signaling client for the streamrtc platform.
//!
//! The client owns one logical connection to the platform's control channel
//! and exposes the two calls the negotiation core needs:
//!
//! - `offerSdp` - send the publishing session's offer plus publish metadata,
//!   receive the SDP answer and the platform-resolved stream metadata
//! - `answerSdp` - answer an offer the platform pushed for the subscribing
//!   session
//!
//! Inbound `sdpOffer` pushes are delivered as [`SignalingEvent::SdpOffer`]
//! on the receiver returned by [`SignalingClient::new`].
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "ws")]
//! # async fn example() -> streamrtc_signaling::Result<()> {
//! use std::sync::Arc;
//! use streamrtc_signaling::{
//!     AuthParams, ConnectOptions, SignalingClient, SignalingConfig, SignalingEvent,
//!     WebSocketConnector,
//! };
//!
//! let (client, mut events) =
//!     SignalingClient::new(Arc::new(WebSocketConnector::new()), SignalingConfig::default());
//! client
//!     .connect(&AuthParams::new("device-token"), &ConnectOptions::default())
//!     .await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let SignalingEvent::SdpOffer(offer) = event {
//!         println!("offer revision {}", offer.sdp_revision);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod client;
pub mod error;
pub mod rpc;
pub mod types;
#[cfg(feature = "ws")]
pub mod ws;

pub use channel::{ChannelEvent, RpcChannel, RpcConnector};
pub use client::{
    ConnectOptions, DEFAULT_WEBSOCKET_URL, SdpSignaling, SignalingClient, SignalingConfig,
    SignalingEvent,
};
pub use error::{Result, SignalingError};
pub use rpc::RpcError;
pub use types::{
    AnswerSdpRequest, AuthParams, MediaPreferences, MediaType, OfferSdpRequest, PublishMetadata,
    PublishSdpAnswer, StreamId, StreamMetadata, StreamMetadataMap, StreamPublishMetadata,
    SubscribeSdpOffer,
};
#[cfg(feature = "ws")]
pub use ws::{WebSocketChannel, WebSocketConnector};
