//! Signaling client
//!
//! Owns exactly one logical connection to the platform's control channel.
//! Pushes from the platform are surfaced on the event receiver returned by
//! [`SignalingClient::new`]; calls are made through the [`SdpSignaling`]
//! methods.

use crate::channel::{ChannelEvent, RpcChannel, RpcConnector};
use crate::error::{Result, SignalingError};
use crate::types::{
    AnswerSdpRequest, AuthParams, MediaPreferences, OfferSdpRequest, PublishMetadata,
    PublishSdpAnswer, SubscribeSdpOffer,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Default platform endpoint
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://device.webrtc.bandwidth.com";

/// Default keep-alive period in seconds
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 300;

/// Signaling client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Base URL of the platform's signaling endpoint
    pub websocket_url: String,
    /// Client name reported to the platform
    pub client_name: String,
    /// SDK version reported to the platform
    pub sdk_version: String,
    /// Keep-alive period in seconds
    pub keepalive_interval_secs: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            client_name: "streamrtc".to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            keepalive_interval_secs: DEFAULT_KEEPALIVE_INTERVAL_SECS,
        }
    }
}

impl SignalingConfig {
    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into();
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_sdk_version(mut self, version: impl Into<String>) -> Self {
        self.sdk_version = version.into();
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval_secs = interval.as_secs().max(1);
        self
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs.max(1))
    }
}

/// Per-connection overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Replaces the configured base URL for this connection
    pub websocket_url: Option<String>,
}

/// Events surfaced by the signaling client
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// The platform pushed a new offer for the subscribing session
    SdpOffer(SubscribeSdpOffer),
    /// The channel was lost without a local `disconnect`
    Disconnected,
}

/// The calls the session negotiator makes against the platform
#[async_trait]
pub trait SdpSignaling: Send + Sync {
    /// Whether a usable connection is open
    fn is_connected(&self) -> bool;

    /// Send the publishing session's offer and wait for the platform's answer
    async fn offer_sdp(&self, sdp: &str, metadata: &PublishMetadata) -> Result<PublishSdpAnswer>;

    /// Send the subscribing session's answer
    async fn answer_sdp(&self, sdp: &str) -> Result<()>;
}

struct Connection {
    channel: Arc<dyn RpcChannel>,
    pump: JoinHandle<()>,
    keepalive: JoinHandle<()>,
}

/// JSON-RPC signaling client
pub struct SignalingClient {
    connector: Arc<dyn RpcConnector>,
    config: SignalingConfig,
    unique_id: Uuid,
    connection: parking_lot::Mutex<Option<Connection>>,
    // serializes connect/disconnect across their suspension points
    lifecycle: tokio::sync::Mutex<()>,
    events: mpsc::UnboundedSender<SignalingEvent>,
}

impl SignalingClient {
    /// Create a client and the receiver its events are delivered on
    pub fn new(
        connector: Arc<dyn RpcConnector>,
        config: SignalingConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SignalingEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let client = Self {
            connector,
            config,
            unique_id: Uuid::new_v4(),
            connection: parking_lot::Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
            events,
        };
        (client, events_rx)
    }

    pub fn config(&self) -> &SignalingConfig {
        &self.config
    }

    /// Device id sent as `uniqueId`, stable for the client's lifetime
    pub fn unique_id(&self) -> Uuid {
        self.unique_id
    }

    /// Build the connection URL for `auth`
    pub fn connection_url(&self, auth: &AuthParams, options: &ConnectOptions) -> Result<Url> {
        let base = options
            .websocket_url
            .as_deref()
            .unwrap_or(&self.config.websocket_url)
            .trim_end_matches('/');

        let mut url = Url::parse(&format!("{}/v3/", base))?;
        url.query_pairs_mut()
            .append_pair("token", &auth.device_token)
            .append_pair("client", &self.config.client_name)
            .append_pair("sdkVersion", &self.config.sdk_version)
            .append_pair("uniqueId", &self.unique_id.to_string());
        Ok(url)
    }

    /// Open the channel, exchange media preferences and start the keep-alive
    pub async fn connect(&self, auth: &AuthParams, options: &ConnectOptions) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_connected() {
            return Err(SignalingError::AlreadyConnected);
        }
        let stale = self.connection.lock().take();
        if let Some(stale) = stale {
            stale.pump.abort();
            stale.keepalive.abort();
        }

        let url = self.connection_url(auth, options)?;
        info!(
            "Connecting to signaling endpoint {}",
            url.host_str().unwrap_or("<unknown>")
        );

        let (channel, channel_events) = self.connector.connect(&url).await?;
        let pump = tokio::spawn(pump_events(channel_events, self.events.clone()));

        let preferences = serde_json::to_value(MediaPreferences::default())?;
        if let Err(e) = channel.call("setMediaPreferences", preferences).await {
            warn!("Media preference exchange failed: {}", e);
            pump.abort();
            let _ = channel.close().await;
            return Err(e);
        }

        let keepalive = tokio::spawn(keepalive_loop(
            channel.clone(),
            self.config.keepalive_interval(),
        ));

        *self.connection.lock() = Some(Connection {
            channel,
            pump,
            keepalive,
        });
        info!("Signaling connected");
        Ok(())
    }

    /// Say goodbye, stop the keep-alive and close the channel. A no-op when
    /// not connected.
    pub async fn disconnect(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        let connection = self.connection.lock().take();
        let Some(connection) = connection else {
            return Ok(());
        };

        connection.keepalive.abort();
        if !connection.channel.is_closed() {
            if let Err(e) = connection.channel.notify("leave", json!({})).await {
                debug!("Leave notification not delivered: {}", e);
            }
        }
        connection.pump.abort();
        connection.channel.close().await?;
        info!("Signaling disconnected");
        Ok(())
    }

    fn channel(&self) -> Result<Arc<dyn RpcChannel>> {
        match self.connection.lock().as_ref() {
            Some(connection) if !connection.channel.is_closed() => Ok(connection.channel.clone()),
            _ => Err(SignalingError::NotConnected),
        }
    }
}

#[async_trait]
impl SdpSignaling for SignalingClient {
    fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .is_some_and(|connection| !connection.channel.is_closed())
    }

    async fn offer_sdp(&self, sdp: &str, metadata: &PublishMetadata) -> Result<PublishSdpAnswer> {
        let channel = self.channel()?;
        let params = serde_json::to_value(OfferSdpRequest {
            sdp_offer: sdp.to_string(),
            media_metadata: metadata.clone(),
        })?;

        let result = channel.call("offerSdp", params).await?;
        serde_json::from_value(result)
            .map_err(|e| SignalingError::malformed("offerSdp", e.to_string()))
    }

    async fn answer_sdp(&self, sdp: &str) -> Result<()> {
        let channel = self.channel()?;
        let params = serde_json::to_value(AnswerSdpRequest {
            sdp_answer: sdp.to_string(),
        })?;
        channel.call("answerSdp", params).await?;
        Ok(())
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.pump.abort();
            connection.keepalive.abort();
        }
    }
}

async fn pump_events(
    mut channel_events: mpsc::Receiver<ChannelEvent>,
    events: mpsc::UnboundedSender<SignalingEvent>,
) {
    while let Some(event) = channel_events.recv().await {
        match event {
            ChannelEvent::Notification { method, params } if method == "sdpOffer" => {
                match serde_json::from_value::<SubscribeSdpOffer>(params) {
                    Ok(offer) => {
                        debug!("Received sdpOffer revision {}", offer.sdp_revision);
                        if events.send(SignalingEvent::SdpOffer(offer)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping malformed sdpOffer push: {}", e),
                }
            }
            ChannelEvent::Notification { method, .. } => {
                debug!("Ignoring push '{}'", method);
            }
            ChannelEvent::Error(reason) => warn!("Signaling channel error: {}", reason),
            ChannelEvent::Closed => {
                warn!("Signaling channel closed");
                let _ = events.send(SignalingEvent::Disconnected);
                break;
            }
        }
    }
}

async fn keepalive_loop(channel: Arc<dyn RpcChannel>, period: Duration) {
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    loop {
        ticker.tick().await;
        if channel.is_closed() {
            break;
        }
        // the platform answers pings as calls; a pong still missing when
        // the next ping is due is abandoned so at most one stays in flight
        let channel = channel.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(period, channel.call("ping", json!({}))).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => debug!("Keep-alive ping failed: {}", e),
                Err(_) => debug!("Keep-alive ping unanswered after {:?}", period),
            }
        });
    }
}
