//! # streamrtc - real-time streaming SDK core
//!
//! Publish local media to the streamrtc platform and subscribe to the
//! streams it pushes back, from any runtime that can provide a WebRTC-style
//! peer connection.
//!
//! ## Overview
//!
//! - **Infra Common**: logging setup and configuration loading
//! - **Signaling**: JSON-RPC over WebSocket to the platform
//! - **Session Core**: publish and subscribe negotiation, stream lifecycle
//! - **Client Core**: the application-facing [`RtcClient`](client_core::RtcClient)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamrtc::prelude::*;
//!
//! # async fn example(factory: Arc<dyn PeerConnectionFactory>) -> ClientResult<()> {
//! let client = RtcClientBuilder::new()
//!     .websocket_url("wss://rtc.example.com")
//!     .peer_factory(factory)
//!     .build()?;
//!
//! client.on_stream_available(|stream| println!("subscribed to {}", stream.stream_id()));
//! client.connect(&AuthParams::new("device-token"), RtcOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

// Re-export all crates as modules
pub use streamrtc_client_core as client_core;
pub use streamrtc_infra_common as infra_common;
pub use streamrtc_session_core as session_core;
pub use streamrtc_signaling as signaling;

// Re-export commonly used items for convenience
pub mod prelude {
    //! Common imports for streamrtc applications

    pub use crate::client_core::{
        ClientConfig, ClientError, ClientResult, IceRestartPolicy, PublishInput, RtcClient,
        RtcClientBuilder, RtcOptions,
    };
    pub use crate::infra_common::{LogLevel, LoggingConfig, setup_logging};
    pub use crate::session_core::{
        IceServer, IceTransportPolicy, MediaDevices, MediaStream, MediaStreamConstraints,
        MediaTrack, PeerConnection, PeerConnectionFactory, PublishOptions, RtcStream, StreamRef,
        TrackKind,
    };
    pub use crate::signaling::{AuthParams, StreamId};
}

/// Version of the SDK, as reported to the platform
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// One-line description of the SDK
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
