//! In-memory RPC channel for exercising the signaling client

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use streamrtc_signaling::{ChannelEvent, Result, RpcChannel, RpcConnector, SignalingError};
use tokio::sync::{mpsc, watch};
use url::Url;

pub type Responses = HashMap<String, Result<Value>>;

pub struct FakeChannel {
    calls: Mutex<Vec<(String, Value)>>,
    notifications: Mutex<Vec<(String, Value)>>,
    responses: Mutex<Responses>,
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

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn notifications(&self) -> Vec<(String, Value)> {
        self.notifications.lock().clone()
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
    }

    /// Simulate the platform dropping the connection
    pub async fn drop_connection(&self) {
        self.mark_closed();
        let _ = self.events.send(ChannelEvent::Closed).await;
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
        self.responses
            .lock()
            .get(method)
            .cloned()
            .unwrap_or_else(|| Ok(json!({})))
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
    urls: Mutex<Vec<Url>>,
    channels: Mutex<Vec<Arc<FakeChannel>>>,
    responses: Mutex<Responses>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Preset a response for every channel opened afterwards
    pub fn respond(&self, method: &str, response: Result<Value>) {
        self.responses.lock().insert(method.to_string(), response);
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().clone()
    }

    pub fn channel(&self) -> Arc<FakeChannel> {
        self.channels
            .lock()
            .last()
            .cloned()
            .expect("no channel opened")
    }

    pub fn connections(&self) -> usize {
        self.channels.lock().len()
    }
}

#[async_trait]
impl RpcConnector for FakeConnector {
    async fn connect(
        &self,
        url: &Url,
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
        self.urls.lock().push(url.clone());
        self.channels.lock().push(channel.clone());
        Ok((channel, events_rx))
    }
}

/// Let spawned tasks run on the current-thread runtime
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub async fn recv_within<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .ok()
        .flatten()
}
