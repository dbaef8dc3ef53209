//! Peer connection and negotiator configuration

use serde::{Deserialize, Serialize};

/// A STUN or TURN server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, credential: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.credential = Some(credential.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceTransportPolicy {
    #[default]
    All,
    Relay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundlePolicy {
    Balanced,
    #[default]
    MaxBundle,
    MaxCompat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtcpMuxPolicy {
    #[default]
    Require,
}

/// Configuration handed to the media capability for each peer connection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RtcConfiguration {
    pub ice_servers: Vec<IceServer>,
    pub ice_transport_policy: IceTransportPolicy,
    pub bundle_policy: BundlePolicy,
    pub rtcp_mux_policy: RtcpMuxPolicy,
}

impl RtcConfiguration {
    pub fn with_ice_server(mut self, server: IceServer) -> Self {
        self.ice_servers.push(server);
        self
    }

    pub fn with_ice_transport_policy(mut self, policy: IceTransportPolicy) -> Self {
        self.ice_transport_policy = policy;
        self
    }
}

/// Negotiator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
    pub rtc: RtcConfiguration,
    /// Open the `__heartbeat__` data channel on every peer connection
    pub heartbeat_channel: bool,
    /// Open the receive-only `__diagnostics__` data channel as well
    pub diagnostics_channel: bool,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            rtc: RtcConfiguration::default(),
            heartbeat_channel: true,
            diagnostics_channel: true,
        }
    }
}

impl NegotiatorConfig {
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
}
