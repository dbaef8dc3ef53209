//! RPC channel abstraction
//!
//! The signaling client never talks to a socket directly. It opens an
//! [`RpcChannel`] through an [`RpcConnector`] and receives unsolicited
//! traffic on the event receiver handed back by `connect`, the same way a
//! transport hands back its event receiver when bound.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Capacity of the channel event queue
pub const CHANNEL_EVENT_CAPACITY: usize = 100;

/// Event emitted by an open channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Unsolicited push from the platform
    Notification { method: String, params: Value },
    /// The channel closed, by either side
    Closed,
    /// A non-fatal channel error, such as an undecodable frame
    Error(String),
}

/// Bidirectional call/notify channel
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Issue a call and wait for its result
    async fn call(&self, method: &str, params: Value) -> Result<Value>;

    /// Send a notification; no response is expected
    async fn notify(&self, method: &str, params: Value) -> Result<()>;

    /// Close the channel. Closing twice is harmless.
    async fn close(&self) -> Result<()>;

    /// Whether the channel is closed
    fn is_closed(&self) -> bool;
}

/// Opens channels to a platform URL
#[async_trait]
pub trait RpcConnector: Send + Sync {
    async fn connect(
        &self,
        url: &Url,
    ) -> Result<(Arc<dyn RpcChannel>, mpsc::Receiver<ChannelEvent>)>;
}
