//! In-memory media stack and signaling doubles for negotiator tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use streamrtc_session_core::media::{OfferOptions, TransceiverInit};
use streamrtc_session_core::{
    DataChannel, DataChannelInit, MediaError, MediaResult, MediaStream, MediaTrack, PeerConnection,
    PeerConnectionFactory, PeerConnectionState, PeerEvent, RtcConfiguration, RtcStream,
    RtpTransceiver, SessionDescription, StreamEventHandler, TrackId, TrackKind,
};
use streamrtc_signaling::{
    PublishMetadata, PublishSdpAnswer, SdpSignaling, SignalingError, StreamId, StreamMetadata,
    StreamMetadataMap,
};
use tokio::sync::mpsc;

pub const REMOTE_OFFER: &str = "v=0\r\n\
o=- 10 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=sendonly\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:1\r\n";

pub const LOCAL_ANSWER: &str = "v=0\r\n\
o=- 20 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=setup:active\r\n\
a=mid:0\r\n\
a=recvonly\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:1\r\n\
a=setup:actpass\r\n\
a=recvonly\r\n";

pub const PUBLISH_ANSWER: &str = "v=0\r\n\
o=- 30 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=setup:passive\r\n\
a=mid:0\r\n\
a=recvonly\r\n";

/// Let spawned tasks run
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

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

/// Build a stream and keep typed handles on its tracks
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

pub struct FakeTransceiver {
    track: Mutex<Option<Arc<dyn MediaTrack>>>,
    pub init: TransceiverInit,
    stopped: AtomicBool,
}

impl FakeTransceiver {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
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

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub struct FakeDataChannel {
    label: String,
    pub init: DataChannelInit,
    sent: Mutex<Vec<String>>,
}

impl FakeDataChannel {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

impl DataChannel for FakeDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn send_text(&self, message: &str) -> MediaResult<()> {
        self.sent.lock().push(message.to_string());
        Ok(())
    }
}

/// Peer connection that records what the negotiator asked of it
pub struct FakePeer {
    ops: Mutex<Vec<String>>,
    offers: Mutex<Vec<OfferOptions>>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    transceivers: Mutex<Vec<Arc<FakeTransceiver>>>,
    data_channels: Mutex<Vec<Arc<FakeDataChannel>>>,
    answer: Mutex<String>,
    offer_count: AtomicUsize,
    pub fail_set_remote: AtomicBool,
    pub fail_create_offer: AtomicBool,
    closed: AtomicBool,
}

impl FakePeer {
    fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            offers: Mutex::new(Vec::new()),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            transceivers: Mutex::new(Vec::new()),
            data_channels: Mutex::new(Vec::new()),
            answer: Mutex::new(LOCAL_ANSWER.to_string()),
            offer_count: AtomicUsize::new(0),
            fail_set_remote: AtomicBool::new(false),
            fail_create_offer: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().clone()
    }

    pub fn offer_options(&self) -> Vec<OfferOptions> {
        self.offers.lock().clone()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    pub fn fake_transceivers(&self) -> Vec<Arc<FakeTransceiver>> {
        self.transceivers.lock().clone()
    }

    pub fn sending_track_ids(&self) -> Vec<String> {
        self.transceivers
            .lock()
            .iter()
            .filter_map(|transceiver| transceiver.sender_track_id())
            .map(|id| id.to_string())
            .collect()
    }

    pub fn data_channel(&self, label: &str) -> Option<Arc<FakeDataChannel>> {
        self.data_channels
            .lock()
            .iter()
            .find(|channel| channel.label == label)
            .cloned()
    }

    pub fn set_answer(&self, sdp: &str) {
        *self.answer.lock() = sdp.to_string();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, op: impl Into<String>) {
        self.ops.lock().push(op.into());
    }
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn create_offer(&self, options: &OfferOptions) -> MediaResult<SessionDescription> {
        self.record("create_offer");
        if self.fail_create_offer.load(Ordering::SeqCst) {
            return Err(MediaError::failed("createOffer", "injected"));
        }
        self.offers.lock().push(*options);
        let n = self.offer_count.fetch_add(1, Ordering::SeqCst);
        let tracks = self.sending_track_ids().len();
        Ok(SessionDescription::offer(format!(
            "v=0\r\no=- {} 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\na=x-tracks:{}\r\n",
            n, tracks
        )))
    }

    async fn create_answer(&self) -> MediaResult<SessionDescription> {
        self.record("create_answer");
        Ok(SessionDescription::answer(self.answer.lock().clone()))
    }

    async fn set_local_description(&self, description: SessionDescription) -> MediaResult<()> {
        self.record(format!("set_local:{:?}", description.sdp_type).to_lowercase());
        *self.local.lock() = Some(description);
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> MediaResult<()> {
        self.record(format!("set_remote:{:?}", description.sdp_type).to_lowercase());
        if self.fail_set_remote.load(Ordering::SeqCst) {
            return Err(MediaError::failed("setRemoteDescription", "injected"));
        }
        *self.remote.lock() = Some(description);
        Ok(())
    }

    fn add_transceiver(
        &self,
        track: Arc<dyn MediaTrack>,
        init: TransceiverInit,
    ) -> MediaResult<Arc<dyn RtpTransceiver>> {
        self.record(format!("add_transceiver:{}", track.id()));
        let transceiver = Arc::new(FakeTransceiver {
            track: Mutex::new(Some(track)),
            init,
            stopped: AtomicBool::new(false),
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
        self.record("remove_track");
        self.transceivers
            .lock()
            .retain(|own| !std::ptr::addr_eq(Arc::as_ptr(own), Arc::as_ptr(transceiver)));
        Ok(())
    }

    fn create_data_channel(
        &self,
        label: &str,
        init: DataChannelInit,
    ) -> MediaResult<Arc<dyn DataChannel>> {
        let channel = Arc::new(FakeDataChannel {
            label: label.to_string(),
            init,
            sent: Mutex::new(Vec::new()),
        });
        self.data_channels.lock().push(channel.clone());
        Ok(channel)
    }

    fn connection_state(&self) -> PeerConnectionState {
        if self.is_closed() {
            PeerConnectionState::Closed
        } else {
            PeerConnectionState::New
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out [`FakePeer`]s in creation order and keeps their event senders
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

    pub fn last_peer(&self) -> Arc<FakePeer> {
        let peers = self.peers.lock();
        peers[peers.len() - 1].0.clone()
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
        let peer = Arc::new(FakePeer::new());
        self.configs.lock().push(config.clone());
        self.peers.lock().push((peer.clone(), tx));
        Ok((peer, rx))
    }
}

/// Platform double answering `offerSdp` and recording `answerSdp`
pub struct FakeSignaling {
    connected: AtomicBool,
    offers: Mutex<Vec<(String, PublishMetadata)>>,
    answers: Mutex<Vec<String>>,
    resolved: Mutex<StreamMetadataMap>,
    pub fail_offer: AtomicBool,
    pub empty_answer: AtomicBool,
    pub fail_answer: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSignaling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(true),
            offers: Mutex::new(Vec::new()),
            answers: Mutex::new(Vec::new()),
            resolved: Mutex::new(StreamMetadataMap::new()),
            fail_offer: AtomicBool::new(false),
            empty_answer: AtomicBool::new(false),
            fail_answer: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Metadata the platform resolves for `id` on every later round
    pub fn resolve(&self, id: &str, metadata: StreamMetadata) {
        self.resolved.lock().insert(StreamId::new(id), metadata);
    }

    pub fn offers(&self) -> Vec<(String, PublishMetadata)> {
        self.offers.lock().clone()
    }

    pub fn last_offer_metadata(&self) -> Option<PublishMetadata> {
        self.offers.lock().last().map(|(_, metadata)| metadata.clone())
    }

    pub fn answers(&self) -> Vec<String> {
        self.answers.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SdpSignaling for FakeSignaling {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn offer_sdp(
        &self,
        sdp: &str,
        metadata: &PublishMetadata,
    ) -> streamrtc_signaling::Result<PublishSdpAnswer> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.offers.lock().push((sdp.to_string(), metadata.clone()));
        // give a competing round the chance to interleave
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_offer.load(Ordering::SeqCst) {
            return Err(SignalingError::transport("injected offerSdp failure"));
        }
        let sdp_answer = if self.empty_answer.load(Ordering::SeqCst) {
            String::new()
        } else {
            PUBLISH_ANSWER.to_string()
        };
        let resolved = self.resolved.lock();
        let stream_metadata = metadata
            .keys()
            .filter_map(|id| resolved.get(id).map(|meta| (id.clone(), meta.clone())))
            .collect();
        Ok(PublishSdpAnswer {
            sdp_answer,
            endpoint_id: "ep-local".to_string(),
            stream_metadata,
        })
    }

    async fn answer_sdp(&self, sdp: &str) -> streamrtc_signaling::Result<()> {
        tokio::task::yield_now().await;
        if self.fail_answer.load(Ordering::SeqCst) {
            return Err(SignalingError::ChannelClosed);
        }
        self.answers.lock().push(sdp.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum Seen {
    Available(RtcStream),
    Unavailable(StreamId),
}

/// Stream handler that remembers every callback
#[derive(Default)]
pub struct RecordingHandler {
    seen: Mutex<Vec<Seen>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    pub fn available(&self) -> Vec<RtcStream> {
        self.seen
            .lock()
            .iter()
            .filter_map(|seen| match seen {
                Seen::Available(stream) => Some(stream.clone()),
                Seen::Unavailable(_) => None,
            })
            .collect()
    }

    pub fn unavailable(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter_map(|seen| match seen {
                Seen::Unavailable(id) => Some(id.to_string()),
                Seen::Available(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl StreamEventHandler for RecordingHandler {
    async fn on_stream_available(&self, stream: RtcStream) {
        self.seen.lock().push(Seen::Available(stream));
    }

    async fn on_stream_unavailable(&self, stream_id: StreamId) {
        self.seen.lock().push(Seen::Unavailable(stream_id));
    }
}
