//! Stream reconciliation
//!
//! A subscribed stream may be backed by several tracks that arrive and end
//! independently. [`StreamReconciler`] folds those per-track notifications
//! into exactly one "available" and one "unavailable" per stream lifecycle:
//!
//! ```text
//!   first track ──▶ Pending ──all tracks──▶ Available ──a track ends──▶ Ending
//!                      │                                                   │
//!                      └──────────── last arrived track ends ──────────────┴──▶ (discarded)
//! ```
//!
//! "available" fires on the Pending → Available edge, "unavailable" fires when
//! the arrived set empties. A stream whose tracks all end while it is still
//! Pending still gets its "unavailable", so every stream the application
//! heard about through a track is released.
//!
//! The reconciler is driven by track lifecycle only. Dropping a stream from
//! the subscribed metadata does not end it.

use crate::media::{MediaStream, MediaTrack, TrackId};
use crate::types::RtcStream;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use streamrtc_signaling::{StreamId, StreamMetadataMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Pending,
    Available,
    Ending,
}

/// Stream-level outcome of a track notification
#[derive(Debug, Clone)]
pub enum ReconcileEvent {
    Available(RtcStream),
    Unavailable(StreamId),
}

#[derive(Debug)]
struct TrackedStream {
    stream: MediaStream,
    arrived: HashSet<TrackId>,
    phase: StreamPhase,
}

impl TrackedStream {
    fn complete(&self) -> bool {
        self.stream
            .tracks()
            .iter()
            .all(|track| self.arrived.contains(&track.id()))
    }
}

/// Per-stream arrival bookkeeping for one subscribing session
#[derive(Debug, Default)]
pub struct StreamReconciler {
    streams: HashMap<StreamId, TrackedStream>,
    track_streams: HashMap<TrackId, Vec<StreamId>>,
}

impl StreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a track arrival for each stream it belongs to
    pub fn track_arrived(
        &mut self,
        track: &Arc<dyn MediaTrack>,
        streams: &[MediaStream],
        metadata: &StreamMetadataMap,
    ) -> Vec<ReconcileEvent> {
        let track_id = track.id();
        let mut events = Vec::new();

        for stream in streams {
            let id = stream.id().clone();
            let tracked = self.streams.entry(id.clone()).or_insert_with(|| TrackedStream {
                stream: stream.clone(),
                arrived: HashSet::new(),
                phase: StreamPhase::Pending,
            });
            // the newest handle knows the full track set as of now
            tracked.stream = stream.clone();
            tracked.arrived.insert(track_id.clone());

            let owners = self.track_streams.entry(track_id.clone()).or_default();
            if !owners.contains(&id) {
                owners.push(id.clone());
            }

            match tracked.phase {
                StreamPhase::Pending if tracked.complete() => {
                    tracked.phase = StreamPhase::Available;
                    debug!("Stream {} available", id);
                    events.push(ReconcileEvent::Available(RtcStream::subscribed(
                        tracked.stream.clone(),
                        metadata.get(&id),
                    )));
                }
                StreamPhase::Pending => debug!("Stream {} waiting on additional tracks", id),
                StreamPhase::Available | StreamPhase::Ending => {}
            }
        }

        events
    }

    /// Record a track end; unknown tracks are ignored
    pub fn track_ended(&mut self, track_id: &TrackId) -> Vec<ReconcileEvent> {
        let Some(owners) = self.track_streams.remove(track_id) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for id in owners {
            let Some(tracked) = self.streams.get_mut(&id) else {
                continue;
            };
            tracked.arrived.remove(track_id);
            if tracked.phase == StreamPhase::Available {
                tracked.phase = StreamPhase::Ending;
            }

            if tracked.arrived.is_empty() {
                debug!("Stream {} unavailable", id);
                self.streams.remove(&id);
                events.push(ReconcileEvent::Unavailable(id));
            } else {
                debug!("Stream {} waiting on tracks to end", id);
            }
        }
        events
    }

    pub fn phase(&self, id: &StreamId) -> Option<StreamPhase> {
        self.streams.get(id).map(|tracked| tracked.phase)
    }

    pub fn tracked_streams(&self) -> usize {
        self.streams.len()
    }
}
