//! Platform, peer connection and capture doubles for client tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use streamrtc_session_core::media::{OfferOptions, TransceiverInit};
use streamrtc_session_core::{
    DataChannel, DataChannelInit, MediaDevices, MediaResult, MediaStream, MediaStreamConstraints,
    MediaTrack, PeerConnection, PeerConnectionFactory, PeerConnectionState, PeerEvent,
    RtcConfiguration, RtpTransceiver, SessionDescription, TrackId, TrackKind,
};
use streamrtc_signaling::{ChannelEvent, Result, RpcChannel, RpcConnector, SignalingError};
use tokio::sync::{mpsc, watch};
use url::Url;

pub const REMOTE_OFFER: &str = "v=0\r\n\
o=- 10 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n";

pub const LOCAL_ANSWER: &str = "v=0\r\n\
o=- 20 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=setup:active\r\n\
a=mid:0\r\n\
a=recvonly\r\n";

pub const PUBLISH_ANSWER: &str = "v=0\r\n\
o=- 30 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=setup:passive\r\n\
a=mid:0\r\n";

/// Let spawned tasks run
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub fn sdp_offer_push(revision: u64, streams: &[&str]) -> Value {
    let metadata: serde_json::Map<String, Value> = streams
        .iter()
        .map(|id| {
            (
                id.to_string(),
                json!({"endpointId": format!("ep-{id}"), "mediaTypes": ["AUDIO"]}),
            )
        })
        .collect();
    json!({
        "sdpOffer": REMOTE_OFFER,
        "sdpRevision": revision,
        "endpointId": "ep-local",
        "streamMetadata": metadata,
    })
}

// ---- signaling ----

pub struct FakeChannel {
    calls: Mutex<Vec<(String, Value)>>,
    notifications: Mutex<Vec<(String, Value)>>,
    responses: Mutex<HashMap<String, Result<Value>>>,
    closed: AtomicBool,
    closed_signal: watch::Sender<bool>,
    held: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    events: mpsc::Sender<ChannelEvent>,
}

/// Counts a held call for as long as its future lives
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeChannel {
    /// Leave calls to `method` unanswered until the channel closes
    pub fn hold(&self, method: &str) {
        self.held.lock().insert(method.to_string());
    }

    /// Held calls still waiting for an answer
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.closed_signal.send_replace(true);
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn notifications_to(&self, method: &str) -> Vec<Value> {
        self.notifications
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn respond(&self, method: &str, response: Result<Value>) {
        self.responses.lock().insert(method.to_string(), response);
    }

    pub async fn push(&self, method: &str, params: Value) {
        self.events
            .send(ChannelEvent::Notification {
                method: method.to_string(),
                params,
            })
            .await
            .unwrap();
        settle().await;
    }

    pub async fn drop_connection(&self) {
        self.mark_closed();
        let _ = self.events.send(ChannelEvent::Closed).await;
        settle().await;
    }
}

#[async_trait]
impl RpcChannel for FakeChannel {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if self.is_closed() {
            return Err(SignalingError::ChannelClosed);
        }
        self.calls.lock().push((method.to_string(), params));
        let held = self.held.lock().contains(method);
        if held {
            let _in_flight = InFlight::enter(&self.in_flight);
            let mut closed = self.closed_signal.subscribe();
            let _ = closed.wait_for(|closed| *closed).await;
            return Err(SignalingError::ChannelClosed);
        }
        let preset = self.responses.lock().get(method).cloned();
        preset.unwrap_or_else(|| match method {
            "offerSdp" => Ok(json!({
                "sdpAnswer": PUBLISH_ANSWER,
                "endpointId": "ep-local",
                "streamMetadata": {},
            })),
            _ => Ok(json!({})),
        })
    }

    async fn notify(&self, method: &str, params: Value) -> Result<()> {
        if self.is_closed() {
            return Err(SignalingError::ChannelClosed);
        }
        self.notifications.lock().push((method.to_string(), params));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.mark_closed();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeConnector {
    channels: Mutex<Vec<Arc<FakeChannel>>>,
    responses: Mutex<HashMap<String, Result<Value>>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Preset a response for every channel opened afterwards
    pub fn respond(&self, method: &str, response: Result<Value>) {
        self.responses.lock().insert(method.to_string(), response);
    }

    pub fn channel(&self) -> Arc<FakeChannel> {
        self.channels.lock().last().cloned().expect("no channel opened")
    }

    pub fn connections(&self) -> usize {
        self.channels.lock().len()
    }
}

#[async_trait]
impl RpcConnector for FakeConnector {
    async fn connect(
        &self,
        _url: &Url,
    ) -> Result<(Arc<dyn RpcChannel>, mpsc::Receiver<ChannelEvent>)> {
        let (events, events_rx) = mpsc::channel(16);
        let channel = Arc::new(FakeChannel {
            calls: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            responses: Mutex::new(self.responses.lock().clone()),
            closed: AtomicBool::new(false),
            closed_signal: watch::channel(false).0,
            held: Mutex::new(HashSet::new()),
            in_flight: AtomicUsize::new(0),
            events,
        });
        self.channels.lock().push(channel.clone());
        Ok((channel, events_rx))
    }
}

// ---- media ----

#[derive(Debug)]
pub struct FakeTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl FakeTrack {
    pub fn new(id: &str, kind: TrackKind) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> TrackId {
        TrackId::new(self.id.clone())
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub fn stream(id: &str, tracks: &[(&str, TrackKind)]) -> (MediaStream, Vec<Arc<FakeTrack>>) {
    let fakes: Vec<Arc<FakeTrack>> = tracks
        .iter()
        .map(|(track_id, kind)| FakeTrack::new(track_id, *kind))
        .collect();
    let handles = fakes
        .iter()
        .map(|track| track.clone() as Arc<dyn MediaTrack>)
        .collect();
    (MediaStream::new(id, handles), fakes)
}

struct FakeTransceiver {
    track: Mutex<Option<Arc<dyn MediaTrack>>>,
}

#[async_trait]
impl RtpTransceiver for FakeTransceiver {
    fn sender_track_id(&self) -> Option<TrackId> {
        self.track.lock().as_ref().map(|track| track.id())
    }

    async fn replace_sender_track(&self, track: Option<Arc<dyn MediaTrack>>) -> MediaResult<()> {
        *self.track.lock() = track;
        Ok(())
    }

    fn stop(&self) {}
}

struct NullDataChannel {
    label: String,
}

impl DataChannel for NullDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn send_text(&self, _message: &str) -> MediaResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePeer {
    offers: Mutex<Vec<OfferOptions>>,
    transceivers: Mutex<Vec<Arc<FakeTransceiver>>>,
    closed: AtomicBool,
}

impl FakePeer {
    pub fn offer_options(&self) -> Vec<OfferOptions> {
        self.offers.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn create_offer(&self, options: &OfferOptions) -> MediaResult<SessionDescription> {
        self.offers.lock().push(*options);
        Ok(SessionDescription::offer(
            "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\n",
        ))
    }

    async fn create_answer(&self) -> MediaResult<SessionDescription> {
        Ok(SessionDescription::answer(LOCAL_ANSWER))
    }

    async fn set_local_description(&self, _description: SessionDescription) -> MediaResult<()> {
        Ok(())
    }

    async fn set_remote_description(&self, _description: SessionDescription) -> MediaResult<()> {
        Ok(())
    }

    fn add_transceiver(
        &self,
        track: Arc<dyn MediaTrack>,
        _init: TransceiverInit,
    ) -> MediaResult<Arc<dyn RtpTransceiver>> {
        let transceiver = Arc::new(FakeTransceiver {
            track: Mutex::new(Some(track)),
        });
        self.transceivers.lock().push(transceiver.clone());
        Ok(transceiver)
    }

    fn transceivers(&self) -> Vec<Arc<dyn RtpTransceiver>> {
        self.transceivers
            .lock()
            .iter()
            .map(|transceiver| transceiver.clone() as Arc<dyn RtpTransceiver>)
            .collect()
    }

    fn remove_track(&self, transceiver: &Arc<dyn RtpTransceiver>) -> MediaResult<()> {
        self.transceivers
            .lock()
            .retain(|own| !std::ptr::addr_eq(Arc::as_ptr(own), Arc::as_ptr(transceiver)));
        Ok(())
    }

    fn create_data_channel(
        &self,
        label: &str,
        _init: DataChannelInit,
    ) -> MediaResult<Arc<dyn DataChannel>> {
        Ok(Arc::new(NullDataChannel {
            label: label.to_string(),
        }))
    }

    fn connection_state(&self) -> PeerConnectionState {
        PeerConnectionState::New
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakePeerFactory {
    peers: Mutex<Vec<(Arc<FakePeer>, mpsc::Sender<PeerEvent>)>>,
    configs: Mutex<Vec<RtcConfiguration>>,
}

impl FakePeerFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn peer(&self, index: usize) -> Arc<FakePeer> {
        self.peers.lock()[index].0.clone()
    }

    pub fn configs(&self) -> Vec<RtcConfiguration> {
        self.configs.lock().clone()
    }

    pub async fn emit(&self, index: usize, event: PeerEvent) {
        let sender = self.peers.lock()[index].1.clone();
        sender.send(event).await.unwrap();
        settle().await;
    }
}

#[async_trait]
impl PeerConnectionFactory for FakePeerFactory {
    async fn create_peer_connection(
        &self,
        config: &RtcConfiguration,
    ) -> MediaResult<(Arc<dyn PeerConnection>, mpsc::Receiver<PeerEvent>)> {
        let (tx, rx) = mpsc::channel(32);
        let peer = Arc::new(FakePeer::default());
        self.configs.lock().push(config.clone());
        self.peers.lock().push((peer.clone(), tx));
        Ok((peer, rx))
    }
}

/// Capture double handing out fresh fake tracks
#[derive(Default)]
pub struct FakeDevices {
    captured: Mutex<Vec<Arc<FakeTrack>>>,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn captured(&self) -> Vec<Arc<FakeTrack>> {
        self.captured.lock().clone()
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn get_user_media(&self, constraints: &MediaStreamConstraints) -> MediaResult<MediaStream> {
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(("mic-track", TrackKind::Audio));
        }
        if constraints.video {
            tracks.push(("cam-track", TrackKind::Video));
        }
        let (stream, fakes) = stream("captured", &tracks);
        self.captured.lock().extend(fakes);
        Ok(stream)
    }
}
