//! Stream availability callbacks and session events

use crate::media::{IceConnectionState, PeerConnectionState};
use crate::types::RtcStream;
use async_trait::async_trait;
use std::fmt;
use streamrtc_signaling::StreamId;

/// Receives stream availability changes from the subscribing session
#[async_trait]
pub trait StreamEventHandler: Send + Sync {
    /// Every track of a subscribed stream has arrived
    async fn on_stream_available(&self, stream: RtcStream);

    /// Every arrived track of a subscribed stream has ended
    async fn on_stream_unavailable(&self, stream_id: StreamId);
}

/// Which of the two peer sessions an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerDirection {
    Publish,
    Subscribe,
}

impl fmt::Display for PeerDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerDirection::Publish => f.write_str("publishing"),
            PeerDirection::Subscribe => f.write_str("subscribing"),
        }
    }
}

/// Broadcast to every [`subscribe_events`](crate::SessionNegotiator::subscribe_events) receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectionStateChanged {
        direction: PeerDirection,
        state: PeerConnectionState,
    },
    IceConnectionStateChanged {
        direction: PeerDirection,
        state: IceConnectionState,
    },
}
