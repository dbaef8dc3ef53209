//! Client configuration
//!
//! [`ClientConfig`] gathers every setting the client needs and loads from
//! TOML; missing keys fall back to their defaults:
//!
//! ```toml
//! heartbeat_channel = true
//! diagnostics_channel = true
//! log_level = "info"
//!
//! [signaling]
//! websocket_url = "wss://device.webrtc.bandwidth.com"
//! keepalive_interval_secs = 300
//!
//! [rtc]
//! ice_transport_policy = "relay"
//!
//! [[rtc.ice_servers]]
//! urls = ["turn:turn.example.com:3478"]
//! username = "user"
//! credential = "secret"
//!
//! [ice_restart]
//! max_attempts = 5
//! ```

use super::recovery::IceRestartPolicy;
use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use streamrtc_infra_common::LogLevel;
use streamrtc_session_core::{IceServer, IceTransportPolicy, NegotiatorConfig, RtcConfiguration};
use streamrtc_signaling::{ConnectOptions, SignalingConfig};

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub signaling: SignalingConfig,
    pub rtc: RtcConfiguration,
    /// Open the `__heartbeat__` data channel on each peer connection
    pub heartbeat_channel: bool,
    /// Open the `__diagnostics__` data channel on each peer connection
    pub diagnostics_channel: bool,
    pub ice_restart: IceRestartPolicy,
    /// Level applied when the client is built with a log level handle
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling: SignalingConfig::default(),
            rtc: RtcConfiguration::default(),
            heartbeat_channel: true,
            diagnostics_channel: true,
            ice_restart: IceRestartPolicy::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML configuration
    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        let config: Self = streamrtc_infra_common::config::from_toml_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let config: Self = streamrtc_infra_common::config::load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_signaling(mut self, signaling: SignalingConfig) -> Self {
        self.signaling = signaling;
        self
    }

    pub fn with_rtc(mut self, rtc: RtcConfiguration) -> Self {
        self.rtc = rtc;
        self
    }

    pub fn with_heartbeat_channel(mut self, enabled: bool) -> Self {
        self.heartbeat_channel = enabled;
        self
    }

    pub fn with_diagnostics_channel(mut self, enabled: bool) -> Self {
        self.diagnostics_channel = enabled;
        self
    }

    pub fn with_ice_restart(mut self, policy: IceRestartPolicy) -> Self {
        self.ice_restart = policy;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.signaling.websocket_url.trim().is_empty() {
            return Err(ClientError::config("signaling.websocket_url must not be empty"));
        }
        if self.rtc.ice_servers.iter().any(|server| server.urls.is_empty()) {
            return Err(ClientError::config("every rtc.ice_servers entry needs at least one url"));
        }
        self.ice_restart.validate().map_err(ClientError::config)
    }

    /// Negotiator settings with per-connection overrides applied
    pub fn negotiator_config(&self, options: &RtcOptions) -> NegotiatorConfig {
        let mut rtc = self.rtc.clone();
        if let Some(servers) = &options.ice_servers {
            rtc.ice_servers = servers.clone();
        }
        if let Some(policy) = options.ice_transport_policy {
            rtc.ice_transport_policy = policy;
        }
        NegotiatorConfig::default()
            .with_rtc(rtc)
            .with_heartbeat_channel(self.heartbeat_channel)
            .with_diagnostics_channel(self.diagnostics_channel)
    }
}

/// Per-connection overrides for `connect`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtcOptions {
    /// Replaces the configured signaling URL
    pub websocket_url: Option<String>,
    /// Replaces the configured ICE servers
    pub ice_servers: Option<Vec<IceServer>>,
    pub ice_transport_policy: Option<IceTransportPolicy>,
}

impl RtcOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = Some(url.into());
        self
    }

    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = Some(servers);
        self
    }

    pub fn with_ice_transport_policy(mut self, policy: IceTransportPolicy) -> Self {
        self.ice_transport_policy = Some(policy);
        self
    }

    pub(crate) fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            websocket_url: self.websocket_url.clone(),
        }
    }
}
