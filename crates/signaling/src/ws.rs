//! WebSocket implementation of the RPC channel
//!
//! One writer task owns the sink half of the socket and drains an unbounded
//! queue of outbound frames. One reader task owns the stream half, routes
//! responses to the call awaiting them and forwards pushes to the event
//! receiver. When the socket closes every pending call fails with
//! [`SignalingError::ChannelClosed`]. Reconnection is left to the caller.

use crate::channel::{CHANNEL_EVENT_CAPACITY, ChannelEvent, RpcChannel, RpcConnector};
use crate::error::{Result, SignalingError};
use crate::rpc::{InboundMessage, RpcError, decode_message, encode_call, encode_notification};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

type CallResult = std::result::Result<Value, RpcError>;
type PendingCalls = DashMap<u64, oneshot::Sender<CallResult>>;
type PendingResponse = oneshot::Receiver<CallResult>;

/// Opens [`WebSocketChannel`]s with `tokio-tungstenite`
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RpcConnector for WebSocketConnector {
    async fn connect(
        &self,
        url: &Url,
    ) -> Result<(Arc<dyn RpcChannel>, mpsc::Receiver<ChannelEvent>)> {
        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| SignalingError::connection_failed(e.to_string()))?;
        info!("WebSocket connected to {}", url.host_str().unwrap_or("<unknown>"));

        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_EVENT_CAPACITY);

        let pending: Arc<PendingCalls> = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let closing = matches!(frame, Message::Close(_));
                if let Err(e) = sink.send(frame).await {
                    warn!("WebSocket send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            debug!("WebSocket writer stopped");
        });

        let reader_pending = pending.clone();
        let reader_closed = closed.clone();
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => {
                        info!("WebSocket closed by peer");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("WebSocket receive failed: {}", e);
                        break;
                    }
                };

                match decode_message(&text) {
                    Ok(InboundMessage::Response { id, result }) => {
                        match reader_pending.remove(&id) {
                            Some((_, waiter)) => {
                                let _ = waiter.send(result);
                            }
                            None => debug!("Dropping response to unknown call {}", id),
                        }
                    }
                    Ok(InboundMessage::Notification { method, params }) => {
                        if event_tx
                            .send(ChannelEvent::Notification { method, params })
                            .await
                            .is_err()
                        {
                            debug!("Channel event receiver dropped");
                        }
                    }
                    Err(e) => {
                        let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                    }
                }
            }

            reader_closed.store(true, Ordering::SeqCst);
            // dropping the waiters fails every in-flight call
            reader_pending.clear();
            let _ = event_tx.send(ChannelEvent::Closed).await;
        });

        let channel = WebSocketChannel::from_parts(outbound_tx, pending, closed);
        Ok((Arc::new(channel), event_rx))
    }
}

struct PendingGuard<'a> {
    pending: &'a PendingCalls,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

/// An open JSON-RPC channel over a WebSocket
pub struct WebSocketChannel {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Arc<PendingCalls>,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
}

impl WebSocketChannel {
    fn from_parts(
        outbound: mpsc::UnboundedSender<Message>,
        pending: Arc<PendingCalls>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            outbound,
            pending,
            next_id: AtomicU64::new(1),
            closed,
        }
    }

    /// Park a waiter for call `id`
    ///
    /// The reader marks the channel closed before it drains the waiters, so
    /// checking again after the insert catches a close that raced with it.
    fn register(&self, id: u64) -> Result<PendingResponse> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        if self.is_closed() {
            self.pending.remove(&id);
            return Err(SignalingError::ChannelClosed);
        }
        Ok(rx)
    }

    fn send_text(&self, text: String) -> Result<()> {
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| SignalingError::ChannelClosed)
    }
}

#[async_trait]
impl RpcChannel for WebSocketChannel {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if self.is_closed() {
            return Err(SignalingError::ChannelClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = encode_call(id, method, &params)?;
        let rx = self.register(id)?;
        // removes the waiter if this call fails or is dropped before its response
        let _waiter = PendingGuard {
            pending: &self.pending,
            id,
        };

        self.send_text(frame)?;
        debug!("-> {} (id {})", method, id);

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(rpc_error)) => Err(rpc_error.into()),
            Err(_) => Err(SignalingError::ChannelClosed),
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<()> {
        if self.is_closed() {
            return Err(SignalingError::ChannelClosed);
        }
        let frame = encode_notification(method, &params)?;
        self.send_text(frame)
    }

    async fn close(&self) -> Result<()> {
        let already_closed = self.closed.swap(true, Ordering::SeqCst);
        self.pending.clear();
        if !already_closed {
            // the writer may already be gone if the peer closed first
            let _ = self.outbound.send(Message::Close(None));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
