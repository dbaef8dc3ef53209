//! Published and subscribed stream registries
//!
//! The published registry is mutated by `publish`/`unpublish` under the
//! publish lock. The subscribed registry is never edited in place: each
//! accepted inbound offer swaps in a whole new snapshot, and a failed round
//! swaps the previous one back.

use crate::media::MediaStream;
use crate::types::CodecPreferences;
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use streamrtc_signaling::{
    PublishMetadata, StreamId, StreamMetadata, StreamMetadataMap, StreamPublishMetadata,
};

/// A locally published stream
#[derive(Debug, Clone)]
pub struct PublishedStream {
    pub media_stream: MediaStream,
    /// What we tell the platform about the stream
    pub metadata: StreamPublishMetadata,
    /// What the platform resolved for it on the last round
    pub resolved: Option<StreamMetadata>,
    pub codec_preferences: Option<CodecPreferences>,
}

impl PublishedStream {
    pub fn new(media_stream: MediaStream, alias: Option<String>) -> Self {
        Self {
            media_stream,
            metadata: StreamPublishMetadata { alias },
            resolved: None,
            codec_preferences: None,
        }
    }

    pub fn id(&self) -> &StreamId {
        self.media_stream.id()
    }
}

/// Streams published through the publishing session, keyed by msid
#[derive(Debug, Default)]
pub struct PublishedRegistry {
    streams: RwLock<HashMap<StreamId, PublishedStream>>,
}

impl PublishedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream, returning the entry it replaced
    pub fn insert(&self, stream: PublishedStream) -> Option<PublishedStream> {
        self.streams.write().insert(stream.id().clone(), stream)
    }

    pub fn remove(&self, id: &StreamId) -> Option<PublishedStream> {
        self.streams.write().remove(id)
    }

    /// Remove and return every entry
    pub fn drain(&self) -> Vec<PublishedStream> {
        self.streams.write().drain().map(|(_, stream)| stream).collect()
    }

    pub fn get(&self, id: &StreamId) -> Option<PublishedStream> {
        self.streams.read().get(id).cloned()
    }

    pub fn contains(&self, id: &StreamId) -> bool {
        self.streams.read().contains_key(id)
    }

    pub fn streams(&self) -> Vec<PublishedStream> {
        self.streams.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.streams.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.read().is_empty()
    }

    /// Snapshot of the metadata sent with an outbound offer
    pub fn publish_metadata(&self) -> PublishMetadata {
        self.streams
            .read()
            .iter()
            .map(|(id, stream)| (id.clone(), stream.metadata.clone()))
            .collect()
    }

    /// Record the platform's resolved metadata for the streams it names
    pub fn merge_resolved(&self, resolved: &StreamMetadataMap) {
        let mut streams = self.streams.write();
        for (id, metadata) in resolved {
            if let Some(stream) = streams.get_mut(id) {
                stream.resolved = Some(metadata.clone());
            }
        }
    }
}

/// Metadata of the streams offered on the subscribing session
#[derive(Debug, Default)]
pub struct SubscribedRegistry {
    current: ArcSwap<StreamMetadataMap>,
}

impl SubscribedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<StreamMetadataMap> {
        self.current.load_full()
    }

    pub fn get(&self, id: &StreamId) -> Option<StreamMetadata> {
        self.current.load().get(id).cloned()
    }

    /// Install a new snapshot, returning the one it replaced
    pub fn replace(&self, metadata: StreamMetadataMap) -> Arc<StreamMetadataMap> {
        self.current.swap(Arc::new(metadata))
    }

    /// Reinstall a snapshot previously returned by [`replace`](Self::replace)
    pub fn restore(&self, previous: Arc<StreamMetadataMap>) {
        self.current.store(previous);
    }

    pub fn clear(&self) {
        self.current.store(Arc::new(StreamMetadataMap::new()));
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}
