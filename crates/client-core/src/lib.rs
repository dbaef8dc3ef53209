//! # streamrtc-client-core
//!
//! Application-facing client for the streamrtc platform.
//!
//! The crate combines the signaling client and the session negotiator into
//! one [`RtcClient`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamrtc_client_core::{PublishInput, RtcClientBuilder, RtcOptions};
//! use streamrtc_session_core::{
//!     MediaDevices, MediaStreamConstraints, PeerConnectionFactory, PublishOptions,
//! };
//! use streamrtc_signaling::AuthParams;
//!
//! # async fn example(
//! #     factory: Arc<dyn PeerConnectionFactory>,
//! #     devices: Arc<dyn MediaDevices>,
//! # ) -> streamrtc_client_core::ClientResult<()> {
//! let client = RtcClientBuilder::new()
//!     .peer_factory(factory)
//!     .media_devices(devices)
//!     .build()?;
//!
//! client.on_stream_available(|stream| {
//!     println!("remote stream {} is ready", stream.stream_id());
//! });
//! client.on_stream_unavailable(|stream_id| {
//!     println!("remote stream {} went away", stream_id);
//! });
//!
//! client
//!     .connect(&AuthParams::new("device-token"), RtcOptions::default())
//!     .await?;
//! let published = client
//!     .publish(
//!         PublishInput::Constraints(MediaStreamConstraints::audio_only()),
//!         PublishOptions::new().with_alias("mic"),
//!     )
//!     .await?;
//! println!("publishing as {}", published.endpoint_id);
//!
//! client.set_mic_enabled(false, None);
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::{
    ClientConfig, IceRestartPolicy, PublishInput, RtcClient, RtcClientBuilder, RtcOptions,
    StreamCallbacks,
};
pub use error::{ClientError, ClientResult};
