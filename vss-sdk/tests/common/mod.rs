//! Shared test support: an in-memory broker transport.
//!
//! [`MockTransport`] implements the SDK's transport traits over tokio
//! channels so the engine's handshake, ordering, and shutdown behavior
//! can be exercised without a databroker. The paired [`MockServer`]
//! handle plays the broker side: it scripts inbound events, observes
//! every outbound frame, and can end the stream at will.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use vss_sdk::broker::{
    BrokerTransport, MetadataEntry, ProviderSink, ProviderSource, StreamEvent, StreamFrame,
    TransportError, UpdateStream,
};
use vss_sdk::value::Value;

type EventResult = Result<StreamEvent, TransportError>;
type UpdateBatch = Vec<(String, Value)>;

struct MockInner {
    metadata: Mutex<HashMap<String, i32>>,
    values: Mutex<HashMap<String, Value>>,
    /// Reply to a claim frame with an immediate confirmation.
    auto_confirm: AtomicBool,
    /// End the stream as soon as the claim frame arrives (rejection).
    close_on_claim: AtomicBool,
    sent: Mutex<Vec<StreamFrame>>,
    sent_notify: Notify,
    events_tx: Mutex<Option<mpsc::UnboundedSender<EventResult>>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<EventResult>>>,
    updates_tx: Mutex<Option<mpsc::UnboundedSender<UpdateBatch>>>,
    updates_rx: Mutex<Option<mpsc::UnboundedReceiver<UpdateBatch>>>,
    subscribed_paths: Mutex<Vec<String>>,
    actuations: Mutex<Vec<(String, Value)>>,
    unary_publishes: Mutex<Vec<(String, Value)>>,
    sink_closed: AtomicBool,
}

/// The client-side half handed to the SDK under test.
pub struct MockTransport {
    inner: Arc<MockInner>,
}

/// The broker-side half kept by the test.
pub struct MockServer {
    inner: Arc<MockInner>,
}

pub fn mock_transport() -> (MockTransport, MockServer) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let inner = Arc::new(MockInner {
        metadata: Mutex::new(HashMap::new()),
        values: Mutex::new(HashMap::new()),
        auto_confirm: AtomicBool::new(false),
        close_on_claim: AtomicBool::new(false),
        sent: Mutex::new(Vec::new()),
        sent_notify: Notify::new(),
        events_tx: Mutex::new(Some(events_tx)),
        events_rx: Mutex::new(Some(events_rx)),
        updates_tx: Mutex::new(Some(updates_tx)),
        updates_rx: Mutex::new(Some(updates_rx)),
        subscribed_paths: Mutex::new(Vec::new()),
        actuations: Mutex::new(Vec::new()),
        unary_publishes: Mutex::new(Vec::new()),
        sink_closed: AtomicBool::new(false),
    });
    (
        MockTransport {
            inner: Arc::clone(&inner),
        },
        MockServer { inner },
    )
}

impl MockTransport {
    pub fn with_metadata<I, P>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (P, i32)>,
        P: Into<String>,
    {
        {
            let mut metadata = self.inner.metadata.lock().unwrap();
            for (path, id) in entries {
                metadata.insert(path.into(), id);
            }
        }
        self
    }

    pub fn with_value(self, path: impl Into<String>, value: Value) -> Self {
        self.inner
            .values
            .lock()
            .unwrap()
            .insert(path.into(), value);
        self
    }

    /// Confirm ownership as soon as the claim frame arrives.
    pub fn auto_confirm(self) -> Self {
        self.inner.auto_confirm.store(true, Ordering::SeqCst);
        self
    }

    /// End the stream as soon as the claim frame arrives.
    pub fn close_on_claim(self) -> Self {
        self.inner.close_on_claim.store(true, Ordering::SeqCst);
        self
    }
}

impl MockServer {
    /// Scripts one inbound provider-stream event.
    pub fn send_event(&self, event: StreamEvent) {
        if let Some(tx) = self.inner.events_tx.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(event));
        }
    }

    /// Ends the provider stream from the broker side.
    pub fn close_stream(&self) {
        self.inner.events_tx.lock().unwrap().take();
    }

    /// Scripts one batch of subscription updates.
    pub fn send_update(&self, entries: UpdateBatch) {
        if let Some(tx) = self.inner.updates_tx.lock().unwrap().as_ref() {
            let _ = tx.send(entries);
        }
    }

    /// Ends the subscription stream from the broker side.
    pub fn close_updates(&self) {
        self.inner.updates_tx.lock().unwrap().take();
    }

    /// Every outbound frame written so far, in write order.
    pub fn sent_frames(&self) -> Vec<StreamFrame> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// Waits until at least `count` outbound frames have been written.
    /// Wrap in a timeout: this never gives up on its own.
    pub async fn wait_for_sent(&self, count: usize) {
        loop {
            let notified = self.inner.sent_notify.notified();
            if self.sent_frames().len() >= count {
                return;
            }
            notified.await;
        }
    }

    pub fn subscribed_paths(&self) -> Vec<String> {
        self.inner.subscribed_paths.lock().unwrap().clone()
    }

    pub fn actuations(&self) -> Vec<(String, Value)> {
        self.inner.actuations.lock().unwrap().clone()
    }

    pub fn unary_publishes(&self) -> Vec<(String, Value)> {
        self.inner.unary_publishes.lock().unwrap().clone()
    }

    pub fn sink_closed(&self) -> bool {
        self.inner.sink_closed.load(Ordering::SeqCst)
    }
}

impl BrokerTransport for MockTransport {
    type Sink = MockSink;
    type Source = MockSource;
    type Updates = MockUpdates;

    async fn get(&self, path: &str) -> Result<Option<Value>, TransportError> {
        Ok(self.inner.values.lock().unwrap().get(path).cloned())
    }

    async fn publish(&self, path: &str, value: Value) -> Result<(), TransportError> {
        self.inner
            .unary_publishes
            .lock()
            .unwrap()
            .push((path.to_string(), value));
        Ok(())
    }

    async fn actuate(&self, path: &str, value: Value) -> Result<(), TransportError> {
        self.inner
            .actuations
            .lock()
            .unwrap()
            .push((path.to_string(), value));
        Ok(())
    }

    async fn list_metadata(&self, root: &str) -> Result<Vec<MetadataEntry>, TransportError> {
        Ok(self
            .inner
            .metadata
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.starts_with(root))
            .map(|(path, id)| MetadataEntry {
                id: *id,
                path: path.clone(),
                data_type: None,
            })
            .collect())
    }

    async fn open_provider_stream(&self) -> Result<(MockSink, MockSource), TransportError> {
        let rx = self
            .inner
            .events_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| TransportError::Rpc("provider stream already open".to_string()))?;
        Ok((
            MockSink {
                inner: Arc::clone(&self.inner),
            },
            MockSource { rx },
        ))
    }

    async fn subscribe(&self, paths: Vec<String>) -> Result<MockUpdates, TransportError> {
        let rx = self
            .inner
            .updates_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| TransportError::Rpc("subscription stream already open".to_string()))?;
        *self.inner.subscribed_paths.lock().unwrap() = paths;
        Ok(MockUpdates { rx })
    }
}

pub struct MockSink {
    inner: Arc<MockInner>,
}

impl ProviderSink for MockSink {
    async fn send(&mut self, frame: StreamFrame) -> Result<(), TransportError> {
        if self.inner.sink_closed.load(Ordering::SeqCst) {
            return Err(TransportError::StreamClosed);
        }
        let is_claim = matches!(frame, StreamFrame::Claim { .. });
        self.inner.sent.lock().unwrap().push(frame);
        // notify_one stores a permit, so a write landing between the
        // waiter's check and its await is never lost.
        self.inner.sent_notify.notify_one();

        if is_claim {
            if self.inner.close_on_claim.load(Ordering::SeqCst) {
                self.inner.events_tx.lock().unwrap().take();
            } else if self.inner.auto_confirm.load(Ordering::SeqCst) {
                if let Some(tx) = self.inner.events_tx.lock().unwrap().as_ref() {
                    let _ = tx.send(Ok(StreamEvent::ClaimAccepted));
                }
            }
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.inner.sink_closed.store(true, Ordering::SeqCst);
    }
}

pub struct MockSource {
    rx: mpsc::UnboundedReceiver<EventResult>,
}

impl ProviderSource for MockSource {
    async fn next_event(&mut self) -> Option<EventResult> {
        self.rx.recv().await
    }
}

pub struct MockUpdates {
    rx: mpsc::UnboundedReceiver<UpdateBatch>,
}

impl UpdateStream for MockUpdates {
    async fn next_update(&mut self) -> Option<Result<UpdateBatch, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}
