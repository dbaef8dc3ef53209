//! The application-facing RTC client
//!
//! [`RtcClient`] ties one [`SignalingClient`] to a [`SessionNegotiator`]
//! created per connection:
//!
//! - `connect` opens signaling and starts the dispatch loop that feeds
//!   inbound `sdpOffer` pushes to the negotiator one at a time, in arrival
//!   order
//! - `publish`/`unpublish` and the enable toggles go straight to the
//!   negotiator
//! - an ICE restart supervisor watches the publishing connection while
//!   connected
//! - `disconnect` closes the signaling channel and then both peer sessions

use super::config::{ClientConfig, RtcOptions};
use super::events::StreamCallbacks;
use super::recovery::spawn_ice_supervisor;
use super::types::PublishInput;
use crate::error::{ClientError, ClientResult};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use streamrtc_infra_common::{LogLevel, LogLevelHandle};
use streamrtc_session_core::{
    MediaDevices, MediaStream, MediaStreamConstraints, OfferDisposition, PeerConnectionFactory,
    PublishOptions, PublishedStream, RtcStream, SessionError, SessionEvent, SessionNegotiator,
    StreamRef, TrackKind,
};
use streamrtc_signaling::{
    AuthParams, RpcConnector, SdpSignaling, SignalingClient, SignalingError, SignalingEvent,
    StreamId, StreamMetadataMap,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type SessionSlot = Arc<RwLock<Option<Arc<SessionNegotiator>>>>;

/// Publish and subscribe media through the platform
pub struct RtcClient {
    config: ClientConfig,
    signaling: Arc<SignalingClient>,
    peer_factory: Arc<dyn PeerConnectionFactory>,
    media_devices: Option<Arc<dyn MediaDevices>>,
    callbacks: Arc<StreamCallbacks>,
    session: SessionSlot,
    signaling_events: Mutex<Option<mpsc::UnboundedReceiver<SignalingEvent>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
    supervisor_task: Mutex<Option<JoinHandle<()>>>,
    // serializes connect/disconnect
    lifecycle: tokio::sync::Mutex<()>,
    log_handle: Option<LogLevelHandle>,
    log_level: RwLock<LogLevel>,
}

impl RtcClient {
    pub(crate) fn new(
        config: ClientConfig,
        connector: Arc<dyn RpcConnector>,
        peer_factory: Arc<dyn PeerConnectionFactory>,
        media_devices: Option<Arc<dyn MediaDevices>>,
        log_handle: Option<LogLevelHandle>,
    ) -> Self {
        let (signaling, signaling_events) =
            SignalingClient::new(connector, config.signaling.clone());
        let log_level = config.log_level;
        Self {
            config,
            signaling: Arc::new(signaling),
            peer_factory,
            media_devices,
            callbacks: Arc::new(StreamCallbacks::new()),
            session: Arc::new(RwLock::new(None)),
            signaling_events: Mutex::new(Some(signaling_events)),
            dispatch_task: Mutex::new(None),
            supervisor_task: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
            log_handle,
            log_level: RwLock::new(log_level),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.signaling.is_connected()
    }

    /// Connect to the platform with a device token
    ///
    /// Resolves once the signaling channel is open and media preferences
    /// have been exchanged. Connecting while connected fails with
    /// [`SignalingError::AlreadyConnected`].
    pub async fn connect(&self, auth: &AuthParams, options: RtcOptions) -> ClientResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.signaling.is_connected() {
            return Err(SignalingError::AlreadyConnected.into());
        }

        // left over from a connection the platform dropped
        let stale = self.session.write().take();
        if let Some(stale) = stale {
            debug!("Closing sessions of the previous connection");
            stale.close().await;
        }

        let negotiator = Arc::new(SessionNegotiator::new(
            self.signaling.clone(),
            self.peer_factory.clone(),
            self.config.negotiator_config(&options),
        ));
        negotiator.set_stream_handler(self.callbacks.clone());
        *self.session.write() = Some(negotiator.clone());
        self.start_dispatch();

        if let Err(e) = self.signaling.connect(auth, &options.connect_options()).await {
            self.session.write().take();
            return Err(e.into());
        }

        let supervisor = spawn_ice_supervisor(negotiator, self.config.ice_restart.clone());
        if let Some(previous) = std::mem::replace(&mut *self.supervisor_task.lock(), supervisor) {
            previous.abort();
        }

        info!("Connected to the platform");
        Ok(())
    }

    /// Close the signaling channel and both peer sessions
    ///
    /// Published tracks are stopped. Calling it while disconnected is a
    /// no-op.
    pub async fn disconnect(&self) -> ClientResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if let Some(supervisor) = self.supervisor_task.lock().take() {
            supervisor.abort();
        }

        // the channel goes first: a round waiting on the platform only
        // gives up its session lock once its call fails
        let signaling = self.signaling.disconnect().await;

        let negotiator = self.session.write().take();
        if let Some(negotiator) = negotiator {
            negotiator.close().await;
        }

        signaling?;
        info!("Disconnected from the platform");
        Ok(())
    }

    /// Publish captured media or an existing stream
    ///
    /// Media captured here from constraints is stopped again if the round
    /// fails; a stream passed in stays untouched.
    pub async fn publish(
        &self,
        input: impl Into<PublishInput>,
        options: PublishOptions,
    ) -> ClientResult<RtcStream> {
        let negotiator = self.connected_negotiator()?;
        let (stream, captured) = match input.into() {
            PublishInput::Stream(stream) => (stream, false),
            PublishInput::Constraints(constraints) => (self.capture(&constraints).await?, true),
        };

        match negotiator.publish(stream.clone(), options).await {
            Ok(published) => Ok(published),
            Err(e) => {
                if captured {
                    for track in stream.tracks() {
                        track.stop();
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Stop publishing the given streams, or everything when `streams` is
    /// empty
    pub async fn unpublish(&self, streams: &[StreamRef]) -> ClientResult<()> {
        let negotiator = self.session.read().clone();
        match negotiator {
            Some(negotiator) => Ok(negotiator.unpublish(streams).await?),
            None => Ok(()),
        }
    }

    /// Register the callback for remote streams whose tracks have all
    /// arrived; replaces any earlier callback
    pub fn on_stream_available<F>(&self, callback: F)
    where
        F: Fn(RtcStream) + Send + Sync + 'static,
    {
        self.callbacks.set_available(Arc::new(callback));
    }

    /// Register the callback for remote streams whose tracks have all
    /// ended; replaces any earlier callback
    pub fn on_stream_unavailable<F>(&self, callback: F)
    where
        F: Fn(StreamId) + Send + Sync + 'static,
    {
        self.callbacks.set_unavailable(Arc::new(callback));
    }

    /// Enable or disable published audio, optionally for one stream only
    pub fn set_mic_enabled(&self, enabled: bool, stream: Option<&StreamId>) -> usize {
        self.set_tracks_enabled(TrackKind::Audio, enabled, stream)
    }

    /// Enable or disable published video, optionally for one stream only
    pub fn set_camera_enabled(&self, enabled: bool, stream: Option<&StreamId>) -> usize {
        self.set_tracks_enabled(TrackKind::Video, enabled, stream)
    }

    /// Change the SDK's log level at runtime
    ///
    /// Without a [`LogLevelHandle`] the level is only recorded.
    pub fn set_log_level(&self, level: LogLevel) -> ClientResult<()> {
        match &self.log_handle {
            Some(handle) => handle.set_level(level)?,
            None => debug!("No log level handle installed, recording level {} only", level),
        }
        *self.log_level.write() = level;
        Ok(())
    }

    pub fn log_level(&self) -> LogLevel {
        *self.log_level.read()
    }

    pub fn published_streams(&self) -> Vec<PublishedStream> {
        self.session
            .read()
            .as_ref()
            .map(|negotiator| negotiator.published_streams())
            .unwrap_or_default()
    }

    pub fn subscribed_streams(&self) -> Arc<StreamMetadataMap> {
        self.session
            .read()
            .as_ref()
            .map(|negotiator| negotiator.subscribed_streams())
            .unwrap_or_default()
    }

    /// Peer connection state changes of the current connection
    pub fn subscribe_session_events(&self) -> Option<broadcast::Receiver<SessionEvent>> {
        self.session
            .read()
            .as_ref()
            .map(|negotiator| negotiator.subscribe_events())
    }

    fn connected_negotiator(&self) -> ClientResult<Arc<SessionNegotiator>> {
        let negotiator = self.session.read().clone();
        match negotiator {
            Some(negotiator) if self.signaling.is_connected() => Ok(negotiator),
            _ => Err(SessionError::NotConnected.into()),
        }
    }

    fn set_tracks_enabled(&self, kind: TrackKind, enabled: bool, stream: Option<&StreamId>) -> usize {
        let negotiator = self.session.read().clone();
        negotiator
            .map(|negotiator| negotiator.set_tracks_enabled(kind, enabled, stream))
            .unwrap_or(0)
    }

    async fn capture(&self, constraints: &MediaStreamConstraints) -> ClientResult<MediaStream> {
        let devices = self.media_devices.as_ref().ok_or_else(|| {
            ClientError::invalid_configuration(
                "media_devices",
                "publishing from constraints needs a MediaDevices implementation",
            )
        })?;
        Ok(devices.get_user_media(constraints).await?)
    }

    fn start_dispatch(&self) {
        let Some(events) = self.signaling_events.lock().take() else {
            return;
        };
        let task = tokio::spawn(dispatch_signaling_events(events, self.session.clone()));
        *self.dispatch_task.lock() = Some(task);
    }
}

impl Drop for RtcClient {
    fn drop(&mut self) {
        if let Some(task) = self.dispatch_task.get_mut().take() {
            task.abort();
        }
        if let Some(task) = self.supervisor_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Feed signaling pushes to whichever negotiator is current
async fn dispatch_signaling_events(
    mut events: mpsc::UnboundedReceiver<SignalingEvent>,
    session: SessionSlot,
) {
    while let Some(event) = events.recv().await {
        match event {
            SignalingEvent::SdpOffer(offer) => {
                let negotiator = session.read().clone();
                let Some(negotiator) = negotiator else {
                    debug!(
                        "No active session, dropping SDP offer revision {}",
                        offer.sdp_revision
                    );
                    continue;
                };

                let revision = offer.sdp_revision;
                match negotiator.handle_inbound_offer(offer).await {
                    Ok(OfferDisposition::Applied { .. }) => {
                        debug!("Applied SDP offer revision {}", revision)
                    }
                    Ok(OfferDisposition::Stale { .. }) => {}
                    Err(e) => error!(
                        revision,
                        error = %e,
                        category = e.category(),
                        "Failed to apply inbound SDP offer"
                    ),
                }
            }
            SignalingEvent::Disconnected => {
                warn!("Signaling connection lost");
            }
        }
    }
    debug!("Signaling event dispatch ended");
}
