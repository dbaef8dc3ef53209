//! Closure-backed stream callbacks
//!
//! Bridges the negotiator's [`StreamEventHandler`] to the single-slot
//! closures applications register on the client. Registering again replaces
//! the previous closure.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use streamrtc_session_core::{RtcStream, StreamEventHandler};
use streamrtc_signaling::StreamId;
use tracing::debug;

pub type StreamAvailableCallback = Arc<dyn Fn(RtcStream) + Send + Sync>;
pub type StreamUnavailableCallback = Arc<dyn Fn(StreamId) + Send + Sync>;

#[derive(Default)]
pub struct StreamCallbacks {
    available: RwLock<Option<StreamAvailableCallback>>,
    unavailable: RwLock<Option<StreamUnavailableCallback>>,
}

impl fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("available", &self.available.read().is_some())
            .field("unavailable", &self.unavailable.read().is_some())
            .finish()
    }
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, callback: StreamAvailableCallback) {
        *self.available.write() = Some(callback);
    }

    pub fn set_unavailable(&self, callback: StreamUnavailableCallback) {
        *self.unavailable.write() = Some(callback);
    }
}

#[async_trait]
impl StreamEventHandler for StreamCallbacks {
    async fn on_stream_available(&self, stream: RtcStream) {
        let callback = self.available.read().clone();
        match callback {
            Some(callback) => callback(stream),
            None => debug!("No stream available callback, dropping {}", stream.stream_id()),
        }
    }

    async fn on_stream_unavailable(&self, stream_id: StreamId) {
        let callback = self.unavailable.read().clone();
        match callback {
            Some(callback) => callback(stream_id),
            None => debug!("No stream unavailable callback, dropping {}", stream_id),
        }
    }
}
