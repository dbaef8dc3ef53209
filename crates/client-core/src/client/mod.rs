//! Client implementation
//!
//! - [`manager`]: the [`RtcClient`] itself
//! - [`builder`]: fluent construction
//! - [`config`]: configuration and per-connection overrides
//! - [`events`]: closure-backed stream callbacks
//! - [`recovery`]: bounded ICE restart on publishing failures
//! - [`types`]: publish input

pub mod builder;
pub mod config;
pub mod events;
pub mod manager;
pub mod recovery;
pub mod types;

pub use builder::RtcClientBuilder;
pub use config::{ClientConfig, RtcOptions};
pub use events::StreamCallbacks;
pub use manager::RtcClient;
pub use recovery::{IceRestartPolicy, spawn_ice_supervisor};
pub use types::PublishInput;
