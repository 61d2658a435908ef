//! The actuator provider engine.
//!
//! Start-up ordering is normative, because it determines correctness:
//! the stream is opened first, then the receive worker and publish writer
//! are spawned, and only then does the claim frame go out, so the
//! broker's confirmation (or an early command frame) always finds a
//! listener. The caller then blocks on a one-shot confirmation signal,
//! bounded by the claim timeout.

use super::config::ProviderConfig;
use super::types::{
    ActuationCallback, ActuationRequest, EngineState, ProviderError, PublishRequest,
};
use super::worker;
use crate::broker::{BrokerTransport, ConnectConfig, GrpcTransport, ProviderSink, StreamFrame};
use crate::catalog::SignalCatalog;
use crate::resolver::register_paths;
use crate::value::Value;
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Cloneable handle for reporting actual values.
///
/// Callable concurrently from any thread, including from inside an
/// actuation callback, and never blocks the caller on network I/O: the
/// request is queued and the publish writer does the rest. When the
/// bounded queue is full the report is dropped with a warning;
/// fire-and-forget is part of the contract.
#[derive(Clone)]
pub struct PublishHandle {
    tx: mpsc::Sender<PublishRequest>,
}

impl PublishHandle {
    pub fn publish_actual(&self, path: impl Into<String>, value: impl Into<Value>) {
        let request = PublishRequest {
            path: path.into(),
            value: value.into(),
        };
        match self.tx.try_send(request) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(request)) => {
                warn!(path = %request.path, "Publish queue full; dropping actual-value report");
            }
            Err(mpsc::error::TrySendError::Closed(request)) => {
                warn!(path = %request.path, "Publish queue closed; dropping actual-value report");
            }
        }
    }
}

/// Live workers of a streaming session.
struct Workers<K> {
    token: CancellationToken,
    sink: Arc<Mutex<K>>,
    receive: JoinHandle<()>,
    writer: JoinHandle<mpsc::Receiver<PublishRequest>>,
    actuation: thread::JoinHandle<()>,
}

/// A provider session: claims exclusive ownership of actuator paths and
/// receives their commands over one bidirectional stream.
///
/// # Example
///
/// ```ignore
/// use vss_sdk::provider::ActuatorProvider;
///
/// let mut provider = ActuatorProvider::new("127.0.0.1:55555");
/// provider.connect().await?;
/// provider.provide_actuators(&["Vehicle.Cabin.HVAC.IsAirConditioningActive"]).await?;
///
/// let publisher = provider.publish_handle();
/// provider.on_actuate_request(move |request| {
///     // drive the hardware, then report the actual state
///     publisher.publish_actual(request.path.clone(), request.value.clone());
/// });
///
/// provider.start().await?;
/// ```
pub struct ActuatorProvider<T: BrokerTransport = GrpcTransport> {
    address: String,
    connect_config: ConnectConfig,
    config: ProviderConfig,
    transport: Option<T>,
    catalog: Arc<SignalCatalog>,
    paths: Vec<String>,
    callback: Option<Arc<ActuationCallback>>,
    publish_tx: mpsc::Sender<PublishRequest>,
    publish_rx: Option<mpsc::Receiver<PublishRequest>>,
    state: EngineState,
    workers: Option<Workers<T::Sink>>,
}

impl ActuatorProvider<GrpcTransport> {
    /// Creates a provider for the broker at `address` with defaults.
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(address, ProviderConfig::default())
    }

    /// Creates a provider with explicit engine configuration.
    pub fn with_config(address: impl Into<String>, config: ProviderConfig) -> Self {
        let (publish_tx, publish_rx) = mpsc::channel(config.publish_queue_capacity);
        Self {
            address: address.into(),
            connect_config: ConnectConfig::default(),
            config,
            transport: None,
            catalog: Arc::new(SignalCatalog::new()),
            paths: Vec::new(),
            callback: None,
            publish_tx,
            publish_rx: Some(publish_rx),
            state: EngineState::Idle,
            workers: None,
        }
    }

    /// Overrides connection establishment settings.
    pub fn with_connect_config(mut self, connect_config: ConnectConfig) -> Self {
        self.connect_config = connect_config;
        self
    }

    /// Establishes the transport channel and verifies broker liveness.
    pub async fn connect(&mut self) -> Result<(), ProviderError> {
        let transport = GrpcTransport::connect(&self.address, &self.connect_config).await?;
        self.transport = Some(transport);
        Ok(())
    }
}

impl<T: BrokerTransport> ActuatorProvider<T> {
    /// Creates a provider over an already-connected transport.
    pub fn with_transport(transport: T, config: ProviderConfig) -> Self {
        let (publish_tx, publish_rx) = mpsc::channel(config.publish_queue_capacity);
        Self {
            address: String::new(),
            connect_config: ConnectConfig::default(),
            config,
            transport: Some(transport),
            catalog: Arc::new(SignalCatalog::new()),
            paths: Vec::new(),
            callback: None,
            publish_tx,
            publish_rx: Some(publish_rx),
            state: EngineState::Idle,
            workers: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Current engine lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Stops the engine if running and drops the transport.
    pub async fn disconnect(&mut self) {
        self.stop().await;
        self.transport = None;
    }

    /// Registers the actuator paths this session will claim and resolves
    /// their numeric ids. Resolution failures are logged, not fatal:
    /// operations needing the id fail per-call later.
    pub async fn provide_actuators(&mut self, paths: &[&str]) -> Result<(), ProviderError> {
        let transport = self.transport.as_ref().ok_or(ProviderError::NotConnected)?;
        let new_paths: Vec<String> = paths
            .iter()
            .map(|path| path.to_string())
            .filter(|path| !self.paths.contains(path))
            .collect();

        info!(count = new_paths.len(), "Registering actuator ownership");
        let resolved = register_paths(transport, &self.catalog, &new_paths).await;
        if resolved < new_paths.len() {
            warn!(
                unresolved = new_paths.len() - resolved,
                "Some actuator ids could not be resolved"
            );
        }
        self.paths.extend(new_paths);
        Ok(())
    }

    /// Registers the callback invoked for each inbound command.
    pub fn on_actuate_request<F>(&mut self, callback: F)
    where
        F: Fn(ActuationRequest) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
    }

    /// Returns a handle for reporting actual values; valid for the life
    /// of this provider, across restarts.
    pub fn publish_handle(&self) -> PublishHandle {
        PublishHandle {
            tx: self.publish_tx.clone(),
        }
    }

    /// Queues an actual-value report. See [`PublishHandle::publish_actual`].
    pub fn publish_actual(&self, path: impl Into<String>, value: impl Into<Value>) {
        self.publish_handle().publish_actual(path, value)
    }

    /// Opens the provider stream, claims ownership, and enters streaming.
    ///
    /// Returns an error on transport failure, claim rejection, or claim
    /// timeout; in every failure case all workers are stopped and joined
    /// before this returns, and the engine is left in [`EngineState::Failed`].
    pub async fn start(&mut self) -> Result<(), ProviderError> {
        if self.workers.is_some() {
            warn!("Provider already running");
            return Ok(());
        }
        let transport = self.transport.as_ref().ok_or(ProviderError::NotConnected)?;

        self.state = EngineState::Connecting;
        let (sink, source) = match transport.open_provider_stream().await {
            Ok(halves) => halves,
            Err(e) => {
                self.state = EngineState::Failed;
                return Err(e.into());
            }
        };
        self.state = EngineState::Connected;

        let token = CancellationToken::new();
        let sink = Arc::new(Mutex::new(sink));
        let (confirm_tx, confirm_rx) = oneshot::channel();
        let (actuation_tx, actuation_rx) = mpsc::channel(self.config.actuation_queue_capacity);
        let publish_rx = match self.publish_rx.take() {
            Some(rx) => rx,
            None => {
                // A previous teardown lost the queue; recreate it so the
                // existing publish handles keep a live (if new) target.
                let (tx, rx) = mpsc::channel(self.config.publish_queue_capacity);
                self.publish_tx = tx;
                rx
            }
        };

        // Workers listen before the claim goes out: the confirmation or
        // an early command frame must never arrive unheard.
        let receive = tokio::spawn(worker::receive_worker(
            source,
            Arc::clone(&sink),
            Arc::clone(&self.catalog),
            actuation_tx,
            confirm_tx,
            token.clone(),
        ));
        let writer = tokio::spawn(worker::publish_writer(
            publish_rx,
            Arc::clone(&sink),
            Arc::clone(&self.catalog),
            token.clone(),
        ));
        let callback = self.callback.clone();
        let worker_token = token.clone();
        let actuation = match thread::Builder::new()
            .name("vss-actuation".to_string())
            .spawn(move || worker::actuation_worker(actuation_rx, callback, worker_token))
        {
            Ok(handle) => handle,
            Err(e) => {
                token.cancel();
                let _ = receive.await;
                if let Ok(rx) = writer.await {
                    self.publish_rx = Some(rx);
                }
                self.state = EngineState::Failed;
                return Err(e.into());
            }
        };

        let workers = Workers {
            token,
            sink,
            receive,
            writer,
            actuation,
        };

        self.state = EngineState::Claiming;
        info!(count = self.paths.len(), "Sending ownership claim");
        let claim_result = {
            let mut sink = workers.sink.lock().await;
            sink.send(StreamFrame::Claim {
                paths: self.paths.clone(),
            })
            .await
        };
        if let Err(e) = claim_result {
            error!(error = %e, "Failed to send ownership claim");
            self.teardown(workers).await;
            self.state = EngineState::Failed;
            return Err(e.into());
        }

        match tokio::time::timeout(self.config.claim_timeout, confirm_rx).await {
            Ok(Ok(true)) => {
                self.state = EngineState::Confirmed;
                info!("Actuator ownership confirmed");
                self.workers = Some(workers);
                self.state = EngineState::Streaming;
                Ok(())
            }
            Ok(Ok(false)) | Ok(Err(_)) => {
                error!("Stream ended before ownership confirmation");
                self.teardown(workers).await;
                self.state = EngineState::Failed;
                Err(ProviderError::ClaimRejected)
            }
            Err(_) => {
                error!(
                    timeout = ?self.config.claim_timeout,
                    "Timed out waiting for ownership confirmation"
                );
                self.teardown(workers).await;
                self.state = EngineState::Failed;
                Err(ProviderError::ClaimTimeout(self.config.claim_timeout))
            }
        }
    }

    /// Stops the engine: cancels every worker (broadcast wake), joins
    /// them, and half-closes the stream. Idempotent: calling `stop()`
    /// when not running is a no-op.
    pub async fn stop(&mut self) {
        let Some(workers) = self.workers.take() else {
            debug!("Provider not running; stop is a no-op");
            return;
        };
        info!("Stopping provider");
        self.state = EngineState::Stopping;
        self.teardown(workers).await;
        self.state = EngineState::Stopped;
        info!("Provider stopped");
    }

    /// Cancels, joins, and half-closes. Used by both the failure paths in
    /// `start()` and the normal `stop()`.
    async fn teardown(&mut self, workers: Workers<T::Sink>) {
        let Workers {
            token,
            sink,
            receive,
            writer,
            actuation,
        } = workers;

        // One cancel wakes every waiter: the receive worker's stream
        // read, the publish writer's queue wait, and (by closing the
        // queue's producer side) the actuation worker's blocking receive.
        token.cancel();

        if receive.await.is_err() {
            warn!("Receive worker panicked during shutdown");
        }
        match writer.await {
            Ok(rx) => self.publish_rx = Some(rx),
            Err(_) => warn!("Publish writer panicked during shutdown"),
        }
        let joined = tokio::task::spawn_blocking(move || actuation.join()).await;
        if !matches!(joined, Ok(Ok(()))) {
            warn!("Actuation worker exited abnormally");
        }

        let mut sink = sink.lock().await;
        sink.close().await;
    }
}
