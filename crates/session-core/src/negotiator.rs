//! Session negotiator
//!
//! Owns the two peer sessions and runs offer/answer in both directions:
//!
//! - **Publishing session** - we offer, the platform answers. `publish`,
//!   `unpublish` and `restart_ice` hold the publish lock for their whole
//!   sequence (mutate transceivers and registry, create the offer, send it
//!   with a full metadata snapshot, apply local then remote description), so
//!   concurrent calls cannot interleave half-built offers.
//! - **Subscribing session** - the platform offers, we answer. Inbound offers
//!   are handled under the subscribe lock and admitted only when their
//!   revision is strictly greater than the last one applied.
//!
//! Each lock owns the session it protects, so the session cannot be touched
//! without holding it. `tokio::sync::Mutex` queues waiters in arrival order.
//!
//! Nothing here retries. A failed round is reported to the caller and the
//! lock is released on every exit path.

use crate::config::NegotiatorConfig;
use crate::errors::{MediaResult, Result, SessionError};
use crate::events::{PeerDirection, SessionEvent, StreamEventHandler};
use crate::media::{
    DataChannel, DataChannelInit, MediaStream, OfferOptions, PeerConnection,
    PeerConnectionFactory, PeerConnectionState, PeerEvent, RtpTransceiver, SessionDescription,
    TrackId, TrackKind, TransceiverDirection, TransceiverInit,
};
use crate::reconcile::{ReconcileEvent, StreamReconciler};
use crate::registry::{PublishedRegistry, PublishedStream, SubscribedRegistry};
use crate::sdp;
use crate::types::{CodecPreferences, PublishOptions, RtcStream, StreamRef};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use streamrtc_signaling::{
    MediaType, PublishSdpAnswer, SdpSignaling, StreamId, StreamMetadataMap, SubscribeSdpOffer,
};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Label of the keep-alive data channel opened on each peer session
pub const HEARTBEAT_CHANNEL_LABEL: &str = "__heartbeat__";

/// Label of the data channel the platform pushes diagnostics on
pub const DIAGNOSTICS_CHANNEL_LABEL: &str = "__diagnostics__";

const SESSION_EVENT_CAPACITY: usize = 64;

type HandlerSlot = Arc<RwLock<Option<Arc<dyn StreamEventHandler>>>>;

/// Outcome of [`SessionNegotiator::handle_inbound_offer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDisposition {
    /// The offer was applied and answered
    Applied { revision: u64 },
    /// The offer was not newer than the current revision and was dropped
    Stale { revision: u64, current: u64 },
}

struct PeerSession {
    peer: Arc<dyn PeerConnection>,
    events_task: JoinHandle<()>,
    // receive-only, its messages arrive as peer events
    _diagnostics: Option<Arc<dyn DataChannel>>,
}

impl PeerSession {
    async fn shutdown(self) {
        self.events_task.abort();
        self.peer.close().await;
    }
}

#[derive(Default)]
struct SubscribeState {
    session: Option<PeerSession>,
    revision: u64,
}

/// Drives both peer sessions against the platform
pub struct SessionNegotiator {
    signaling: Arc<dyn SdpSignaling>,
    peer_factory: Arc<dyn PeerConnectionFactory>,
    config: NegotiatorConfig,
    /// Publish lock
    publishing: Mutex<Option<PeerSession>>,
    /// Subscribe lock
    subscribing: Mutex<SubscribeState>,
    published: Arc<PublishedRegistry>,
    subscribed: Arc<SubscribedRegistry>,
    // readable without the subscribe lock
    revision: AtomicU64,
    handler: HandlerSlot,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionNegotiator {
    pub fn new(
        signaling: Arc<dyn SdpSignaling>,
        peer_factory: Arc<dyn PeerConnectionFactory>,
        config: NegotiatorConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            signaling,
            peer_factory,
            config,
            publishing: Mutex::new(None),
            subscribing: Mutex::new(SubscribeState::default()),
            published: Arc::new(PublishedRegistry::new()),
            subscribed: Arc::new(SubscribedRegistry::new()),
            revision: AtomicU64::new(0),
            handler: Arc::new(RwLock::new(None)),
            events,
        }
    }

    /// Install the stream availability handler, replacing any previous one
    pub fn set_stream_handler(&self, handler: Arc<dyn StreamEventHandler>) {
        *self.handler.write() = Some(handler);
    }

    pub fn clear_stream_handler(&self) {
        *self.handler.write() = None;
    }

    /// Receive peer connection state changes of both sessions
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn published_streams(&self) -> Vec<PublishedStream> {
        self.published.streams()
    }

    /// Current subscribed metadata snapshot
    pub fn subscribed_streams(&self) -> Arc<StreamMetadataMap> {
        self.subscribed.snapshot()
    }

    /// Revision of the last applied inbound offer
    pub fn subscribe_revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Publish `media_stream` and negotiate it with the platform
    ///
    /// The publishing session is created on first use. On failure the
    /// stream's transceivers and registry entry are reverted; its tracks are
    /// left running since they belong to the caller.
    pub async fn publish(&self, media_stream: MediaStream, options: PublishOptions) -> Result<RtcStream> {
        self.ensure_connected()?;
        let mut publishing = self.publishing.lock().await;
        let session = match publishing.take() {
            Some(session) => session,
            None => self.open_peer_session(PeerDirection::Publish).await?,
        };
        let session = publishing.insert(session);

        let id = media_stream.id().clone();
        info!("Publishing stream {} (alias {:?})", id, options.alias);

        let added = attach_stream(
            &session.peer,
            &media_stream,
            options.codec_preferences.as_ref(),
        )
        .await?;

        let mut entry = PublishedStream::new(media_stream.clone(), options.alias.clone());
        entry.codec_preferences = options.codec_preferences.clone();
        let replaced = self.published.insert(entry);

        match self.offer_publish_packet(session, false).await {
            Ok(answer) => {
                let resolved = answer.stream_metadata.get(&id);
                Ok(RtcStream {
                    endpoint_id: resolved
                        .map(|meta| meta.endpoint_id.clone())
                        .unwrap_or_else(|| id.to_string()),
                    media_types: resolved
                        .map(|meta| meta.media_types.clone())
                        .unwrap_or_else(|| vec![MediaType::Application]),
                    alias: options
                        .alias
                        .or_else(|| resolved.and_then(|meta| meta.alias.clone())),
                    participant_id: resolved.and_then(|meta| meta.participant_id.clone()),
                    media_stream,
                })
            }
            Err(e) => {
                warn!("Publishing stream {} failed: {}", id, e);
                for transceiver in &added {
                    detach_transceiver(&session.peer, transceiver).await;
                }
                match replaced {
                    Some(previous) => {
                        self.published.insert(previous);
                    }
                    None => {
                        self.published.remove(&id);
                    }
                }
                Err(e)
            }
        }
    }

    /// Stop publishing the named streams, or every stream when `streams` is
    /// empty, and tell the platform
    ///
    /// Unknown streams are ignored. Streams are released locally before the
    /// round runs and stay released if it fails.
    pub async fn unpublish(&self, streams: &[StreamRef]) -> Result<()> {
        let publishing = self.publishing.lock().await;
        let Some(session) = &*publishing else {
            debug!("No publishing session, nothing to unpublish");
            return Ok(());
        };
        self.ensure_connected()?;

        let targets = if streams.is_empty() {
            self.published.drain()
        } else {
            let removed: Vec<PublishedStream> = streams
                .iter()
                .filter_map(|stream| self.published.remove(stream.stream_id()))
                .collect();
            if removed.is_empty() {
                debug!("None of the requested streams are published");
                return Ok(());
            }
            removed
        };

        info!("Unpublishing {} stream(s)", targets.len());
        for stream in &targets {
            release_stream(&session.peer, &stream.media_stream).await;
        }

        self.offer_publish_packet(session, false).await?;
        Ok(())
    }

    /// Renegotiate the publishing session with a fresh ICE ufrag/pwd
    pub async fn restart_ice(&self) -> Result<()> {
        self.ensure_connected()?;
        let publishing = self.publishing.lock().await;
        let Some(session) = &*publishing else {
            debug!("No publishing session, skipping ICE restart");
            return Ok(());
        };

        info!("Restarting ICE on the publishing session");
        self.offer_publish_packet(session, true).await?;
        Ok(())
    }

    /// Enable or disable every published track of `kind`, optionally limited
    /// to one stream. Returns how many tracks were touched.
    pub fn set_tracks_enabled(&self, kind: TrackKind, enabled: bool, stream: Option<&StreamId>) -> usize {
        info!("Setting {} tracks enabled: {}", kind.as_str(), enabled);
        let mut changed = 0;
        for published in self.published.streams() {
            if stream.is_some_and(|id| id != published.id()) {
                continue;
            }
            for track in published.media_stream.tracks_of_kind(kind) {
                track.set_enabled(enabled);
                changed += 1;
            }
        }
        changed
    }

    /// Apply an offer pushed by the platform for the subscribing session
    ///
    /// An offer without any `m=` section is rejected with
    /// [`SessionError::InvalidSdp`] and leaves the revision untouched.
    pub async fn handle_inbound_offer(&self, offer: SubscribeSdpOffer) -> Result<OfferDisposition> {
        let mut state = self.subscribing.lock().await;
        info!("Received SDP offer revision {}", offer.sdp_revision);

        if offer.sdp_revision <= state.revision {
            debug!(
                "SDP offer revision {} is not newer than current revision {}, ignoring",
                offer.sdp_revision, state.revision
            );
            return Ok(OfferDisposition::Stale {
                revision: offer.sdp_revision,
                current: state.revision,
            });
        }

        let previous = self.subscribed.replace(offer.stream_metadata.clone());
        match self.apply_inbound_offer(&mut state, &offer).await {
            Ok(()) => {
                state.revision = offer.sdp_revision;
                self.revision.store(offer.sdp_revision, Ordering::SeqCst);
                debug!("Set current SDP revision to {}", offer.sdp_revision);
                Ok(OfferDisposition::Applied {
                    revision: offer.sdp_revision,
                })
            }
            Err(e) => {
                self.subscribed.restore(previous);
                Err(e)
            }
        }
    }

    /// Tear everything down: published streams, both sessions, both
    /// registries and the revision counter
    ///
    /// Waits for any round in flight to release its session lock, so the
    /// signaling channel should be closed first.
    pub async fn close(&self) {
        info!("Closing publishing and subscribing sessions");
        {
            let mut publishing = self.publishing.lock().await;
            let streams = self.published.drain();
            match publishing.take() {
                Some(session) => {
                    for stream in &streams {
                        release_stream(&session.peer, &stream.media_stream).await;
                    }
                    session.shutdown().await;
                }
                None => {
                    for stream in &streams {
                        stop_tracks(&stream.media_stream);
                    }
                }
            }
        }

        let mut state = self.subscribing.lock().await;
        if let Some(session) = state.session.take() {
            session.shutdown().await;
        }
        state.revision = 0;
        self.revision.store(0, Ordering::SeqCst);
        self.subscribed.clear();
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.signaling.is_connected() {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    /// One outbound round; `session` can only be borrowed from under the
    /// publish lock
    async fn offer_publish_packet(
        &self,
        session: &PeerSession,
        ice_restart: bool,
    ) -> Result<PublishSdpAnswer> {
        let metadata = self.published.publish_metadata();
        let offer = session
            .peer
            .create_offer(&OfferOptions::send_only(ice_restart))
            .await?;

        debug!(
            "Offering publish SDP with {} stream(s), ice_restart={}",
            metadata.len(),
            ice_restart
        );
        let answer = self.signaling.offer_sdp(&offer.sdp, &metadata).await?;
        if answer.sdp_answer.trim().is_empty() {
            return Err(SessionError::missing_answer("offerSdp returned an empty sdpAnswer"));
        }

        session.peer.set_local_description(offer).await?;
        session
            .peer
            .set_remote_description(SessionDescription::answer(answer.sdp_answer.clone()))
            .await?;

        self.published.merge_resolved(&answer.stream_metadata);
        Ok(answer)
    }

    async fn apply_inbound_offer(
        &self,
        state: &mut SubscribeState,
        offer: &SubscribeSdpOffer,
    ) -> Result<()> {
        // fails with InvalidSdp when the offer carries no media section
        let remote = sdp::offer_actpass_setup(&offer.sdp_offer)?;

        let session = match state.session.take() {
            Some(session) => session,
            None => {
                let session = self.open_peer_session(PeerDirection::Subscribe).await?;
                state.revision = 0;
                self.revision.store(0, Ordering::SeqCst);
                session
            }
        };
        let session = state.session.insert(session);

        session
            .peer
            .set_remote_description(SessionDescription::offer(remote))
            .await?;

        let answer = session.peer.create_answer().await?;
        if answer.sdp.trim().is_empty() {
            return Err(SessionError::invalid_sdp("createAnswer returned an empty description"));
        }

        let local = sdp::force_passive_setup(&answer.sdp)?;
        session
            .peer
            .set_local_description(SessionDescription::answer(local.clone()))
            .await?;
        self.signaling.answer_sdp(&local).await?;
        Ok(())
    }

    async fn open_peer_session(&self, direction: PeerDirection) -> Result<PeerSession> {
        debug!("Setting up {} peer connection", direction);
        let (peer, peer_events) = self
            .peer_factory
            .create_peer_connection(&self.config.rtc)
            .await?;

        let heartbeat = match open_control_channel(
            &peer,
            self.config.heartbeat_channel,
            HEARTBEAT_CHANNEL_LABEL,
            0,
        ) {
            Ok(channel) => channel,
            Err(e) => {
                peer.close().await;
                return Err(e.into());
            }
        };
        let diagnostics = match open_control_channel(
            &peer,
            self.config.diagnostics_channel,
            DIAGNOSTICS_CHANNEL_LABEL,
            1,
        ) {
            Ok(channel) => channel,
            Err(e) => {
                peer.close().await;
                return Err(e.into());
            }
        };

        let context = PeerEventContext {
            direction,
            heartbeat,
            handler: self.handler.clone(),
            subscribed: self.subscribed.clone(),
            events: self.events.clone(),
        };
        let events_task = tokio::spawn(context.run(peer_events));

        Ok(PeerSession {
            peer,
            events_task,
            _diagnostics: diagnostics,
        })
    }
}

impl Drop for SessionNegotiator {
    fn drop(&mut self) {
        if let Some(session) = self.publishing.get_mut().take() {
            session.events_task.abort();
        }
        if let Some(session) = self.subscribing.get_mut().session.take() {
            session.events_task.abort();
        }
    }
}

/// Open one of the pre-negotiated platform channels when `enabled`
fn open_control_channel(
    peer: &Arc<dyn PeerConnection>,
    enabled: bool,
    label: &str,
    id: u16,
) -> MediaResult<Option<Arc<dyn DataChannel>>> {
    if !enabled {
        return Ok(None);
    }
    let init = DataChannelInit {
        id: Some(id),
        negotiated: true,
        protocol: "udp".to_string(),
    };
    peer.create_data_channel(label, init).map(Some)
}

/// Add a send-only transceiver for every track of `stream` not already being
/// sent; on failure the transceivers added so far are removed again
async fn attach_stream(
    peer: &Arc<dyn PeerConnection>,
    stream: &MediaStream,
    codec_preferences: Option<&CodecPreferences>,
) -> MediaResult<Vec<Arc<dyn RtpTransceiver>>> {
    let sending: HashSet<TrackId> = peer
        .transceivers()
        .iter()
        .filter_map(|transceiver| transceiver.sender_track_id())
        .collect();

    let mut added = Vec::new();
    for track in stream.tracks() {
        if sending.contains(&track.id()) {
            continue;
        }
        let init = TransceiverInit {
            direction: TransceiverDirection::SendOnly,
            streams: vec![stream.id().clone()],
            codec_preferences: codec_preferences
                .map(|prefs| prefs.for_kind(track.kind()).to_vec())
                .unwrap_or_default(),
        };

        match peer.add_transceiver(track.clone(), init) {
            Ok(transceiver) => added.push(transceiver),
            Err(e) => {
                for transceiver in &added {
                    detach_transceiver(peer, transceiver).await;
                }
                return Err(e);
            }
        }
    }
    Ok(added)
}

async fn detach_transceiver(peer: &Arc<dyn PeerConnection>, transceiver: &Arc<dyn RtpTransceiver>) {
    if let Err(e) = transceiver.replace_sender_track(None).await {
        debug!("Detaching sender track failed: {}", e);
    }
    if let Err(e) = peer.remove_track(transceiver) {
        debug!("Removing sender failed: {}", e);
    }
    transceiver.stop();
}

/// Remove every transceiver sending one of the stream's tracks and stop the
/// tracks
async fn release_stream(peer: &Arc<dyn PeerConnection>, stream: &MediaStream) {
    for track in stream.tracks() {
        let track_id = track.id();
        for transceiver in peer.transceivers() {
            if transceiver.sender_track_id().as_ref() == Some(&track_id) {
                detach_transceiver(peer, &transceiver).await;
            }
        }
        track.stop();
    }
}

fn stop_tracks(stream: &MediaStream) {
    for track in stream.tracks() {
        track.stop();
    }
}

/// State owned by one peer session's event task
struct PeerEventContext {
    direction: PeerDirection,
    heartbeat: Option<Arc<dyn DataChannel>>,
    handler: HandlerSlot,
    subscribed: Arc<SubscribedRegistry>,
    events: broadcast::Sender<SessionEvent>,
}

impl PeerEventContext {
    async fn run(self, mut peer_events: mpsc::Receiver<PeerEvent>) {
        let direction = self.direction;
        // recreated with every subscribing session
        let mut reconciler = StreamReconciler::new();

        while let Some(event) = peer_events.recv().await {
            match event {
                PeerEvent::Track { track, streams } => {
                    debug!("{} track {} ({}) arrived", direction, track.id(), track.kind().as_str());
                    if direction == PeerDirection::Subscribe {
                        let metadata = self.subscribed.snapshot();
                        let outcome = reconciler.track_arrived(&track, &streams, &metadata);
                        self.dispatch(outcome).await;
                    }
                }
                PeerEvent::TrackEnded { track_id } => {
                    debug!("{} track {} ended", direction, track_id);
                    if direction == PeerDirection::Subscribe {
                        let outcome = reconciler.track_ended(&track_id);
                        self.dispatch(outcome).await;
                    }
                }
                PeerEvent::TrackMuted { track_id } => debug!("{} track {} muted", direction, track_id),
                PeerEvent::TrackUnmuted { track_id } => {
                    debug!("{} track {} unmuted", direction, track_id)
                }
                PeerEvent::ConnectionStateChanged(state) => {
                    debug!("{} connection state: {:?}", direction, state);
                    if state == PeerConnectionState::Disconnected {
                        warn!("{} peer disconnected, connection may be reestablished", direction);
                    }
                    let _ = self
                        .events
                        .send(SessionEvent::ConnectionStateChanged { direction, state });
                }
                PeerEvent::IceConnectionStateChanged(state) => {
                    debug!("{} ICE connection state: {:?}", direction, state);
                    let _ = self
                        .events
                        .send(SessionEvent::IceConnectionStateChanged { direction, state });
                }
                PeerEvent::IceGatheringStateChanged(state) => {
                    debug!("{} ICE gathering state: {:?}", direction, state)
                }
                PeerEvent::SignalingStateChanged(state) => {
                    debug!("{} signaling state: {:?}", direction, state)
                }
                PeerEvent::NegotiationNeeded => debug!("{} negotiation needed", direction),
                PeerEvent::DataChannelMessage { label, message } => {
                    self.on_data_channel_message(&label, &message)
                }
            }
        }
        debug!("{} peer event loop ended", direction);
    }

    fn on_data_channel_message(&self, label: &str, message: &str) {
        if label == DIAGNOSTICS_CHANNEL_LABEL {
            info!(direction = %self.direction, "Diagnostics received: {}", message);
            return;
        }
        if label != HEARTBEAT_CHANNEL_LABEL {
            debug!("Message on data channel {}: {}", label, message);
            return;
        }
        debug!("Heartbeat received: {}", message);
        if message == "PING" {
            if let Some(heartbeat) = &self.heartbeat {
                if let Err(e) = heartbeat.send_text("PONG") {
                    warn!("Heartbeat reply failed: {}", e);
                }
            }
        }
    }

    async fn dispatch(&self, outcome: Vec<ReconcileEvent>) {
        if outcome.is_empty() {
            return;
        }
        let handler = self.handler.read().clone();
        let Some(handler) = handler else {
            debug!("No stream handler registered, dropping {} event(s)", outcome.len());
            return;
        };

        for event in outcome {
            match event {
                ReconcileEvent::Available(stream) => handler.on_stream_available(stream).await,
                ReconcileEvent::Unavailable(stream_id) => {
                    handler.on_stream_unavailable(stream_id).await
                }
            }
        }
    }
}
