//! Client builder
//!
//! Fluent construction of an [`RtcClient`]. The peer connection factory is
//! the only required collaborator; signaling defaults to the WebSocket
//! connector and capture is optional (without it only existing streams can
//! be published).
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamrtc_client_core::{IceRestartPolicy, RtcClientBuilder};
//! use streamrtc_session_core::{IceServer, PeerConnectionFactory};
//!
//! # fn example(factory: Arc<dyn PeerConnectionFactory>) -> streamrtc_client_core::ClientResult<()> {
//! let client = RtcClientBuilder::new()
//!     .websocket_url("wss://rtc.example.com")
//!     .ice_server(IceServer::new("stun:stun.example.com:3478"))
//!     .ice_restart(IceRestartPolicy::default().with_max_attempts(5))
//!     .peer_factory(factory)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use super::config::ClientConfig;
use super::manager::RtcClient;
use super::recovery::IceRestartPolicy;
use crate::error::{ClientError, ClientResult};
use std::sync::Arc;
use std::time::Duration;
use streamrtc_infra_common::{LogLevel, LogLevelHandle};
use streamrtc_session_core::{IceServer, IceTransportPolicy, MediaDevices, PeerConnectionFactory};
use streamrtc_signaling::{RpcConnector, WebSocketConnector};

pub struct RtcClientBuilder {
    config: ClientConfig,
    connector: Option<Arc<dyn RpcConnector>>,
    peer_factory: Option<Arc<dyn PeerConnectionFactory>>,
    media_devices: Option<Arc<dyn MediaDevices>>,
    log_handle: Option<LogLevelHandle>,
}

impl RtcClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            connector: None,
            peer_factory: None,
            media_devices: None,
            log_handle: None,
        }
    }

    /// Start from a complete configuration, e.g. one loaded from TOML
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn websocket_url(mut self, url: impl Into<String>) -> Self {
        self.config.signaling.websocket_url = url.into();
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.signaling.client_name = name.into();
        self
    }

    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.signaling = self.config.signaling.with_keepalive_interval(interval);
        self
    }

    pub fn ice_server(mut self, server: IceServer) -> Self {
        self.config.rtc.ice_servers.push(server);
        self
    }

    pub fn ice_transport_policy(mut self, policy: IceTransportPolicy) -> Self {
        self.config.rtc.ice_transport_policy = policy;
        self
    }

    pub fn heartbeat_channel(mut self, enabled: bool) -> Self {
        self.config.heartbeat_channel = enabled;
        self
    }

    pub fn diagnostics_channel(mut self, enabled: bool) -> Self {
        self.config.diagnostics_channel = enabled;
        self
    }

    pub fn ice_restart(mut self, policy: IceRestartPolicy) -> Self {
        self.config.ice_restart = policy;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Handle from `setup_logging`; lets `set_log_level` take effect
    pub fn log_handle(mut self, handle: LogLevelHandle) -> Self {
        self.log_handle = Some(handle);
        self
    }

    /// Replace the default WebSocket transport
    pub fn connector(mut self, connector: Arc<dyn RpcConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn peer_factory(mut self, factory: Arc<dyn PeerConnectionFactory>) -> Self {
        self.peer_factory = Some(factory);
        self
    }

    pub fn media_devices(mut self, devices: Arc<dyn MediaDevices>) -> Self {
        self.media_devices = Some(devices);
        self
    }

    pub fn build(self) -> ClientResult<RtcClient> {
        self.config.validate()?;
        let peer_factory = self.peer_factory.ok_or_else(|| {
            ClientError::invalid_configuration("peer_factory", "a PeerConnectionFactory is required")
        })?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketConnector::new()) as Arc<dyn RpcConnector>);

        if let Some(handle) = &self.log_handle {
            handle.set_level(self.config.log_level)?;
        }

        Ok(RtcClient::new(
            self.config,
            connector,
            peer_factory,
            self.media_devices,
            self.log_handle,
        ))
    }
}

impl Default for RtcClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
