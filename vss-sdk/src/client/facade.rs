//! The client facade.
//!
//! Unary operations are stateless request/response calls; subscriptions
//! share one multiplexed stream whose path list is fixed when
//! [`VssClient::start_subscriptions`] opens it. Initial values are
//! delivered with synchronous reads before the stream is consumed, so a
//! subscriber always sees a value before the first streamed update.

use super::error::ClientError;
use super::subscription::{dispatch_loop, SubscriptionTable};
use crate::broker::{BrokerTransport, ConnectConfig, GrpcTransport};
use crate::signal::{Actuator, Attribute, Sensor};
use crate::value::{SignalValue, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Client for observing and commanding signals.
///
/// # Example
///
/// ```ignore
/// use vss_sdk::client::VssClient;
/// use vss_sdk::signal::{Actuator, Sensor};
///
/// let mut client = VssClient::new("127.0.0.1:55555");
/// client.connect().await?;
///
/// let speed: Sensor<f32> = Sensor::new("Vehicle.Speed");
/// client.subscribe(&speed, |value| println!("speed: {value}"))?;
/// client.start_subscriptions().await?;
///
/// let ac: Actuator<bool> = Actuator::new("Vehicle.Cabin.HVAC.IsAirConditioningActive");
/// client.set_target(&ac, true).await?;
/// ```
pub struct VssClient<T: BrokerTransport = GrpcTransport> {
    address: String,
    connect_config: ConnectConfig,
    transport: Option<T>,
    subscriptions: SubscriptionTable,
    started: bool,
    token: CancellationToken,
    read_task: Option<JoinHandle<()>>,
}

impl VssClient<GrpcTransport> {
    /// Creates a client for the broker at `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_config: ConnectConfig::default(),
            transport: None,
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            started: false,
            token: CancellationToken::new(),
            read_task: None,
        }
    }

    /// Overrides connection establishment settings.
    pub fn with_connect_config(mut self, connect_config: ConnectConfig) -> Self {
        self.connect_config = connect_config;
        self
    }

    /// Establishes the transport channel and verifies broker liveness.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let transport = GrpcTransport::connect(&self.address, &self.connect_config).await?;
        self.transport = Some(transport);
        Ok(())
    }
}

impl<T: BrokerTransport> VssClient<T> {
    /// Creates a client over an already-connected transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            address: String::new(),
            connect_config: ConnectConfig::default(),
            transport: Some(transport),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            started: false,
            token: CancellationToken::new(),
            read_task: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Stops the subscription dispatcher (if running) and drops the
    /// transport.
    pub async fn disconnect(&mut self) {
        if let Some(task) = self.read_task.take() {
            self.token.cancel();
            let _ = task.await;
        }
        self.started = false;
        self.transport = None;
    }

    fn transport(&self) -> Result<&T, ClientError> {
        self.transport.as_ref().ok_or(ClientError::NotConnected)
    }

    // =========================================================================
    // Unary operations
    // =========================================================================

    /// Reads the current value of a signal by path.
    pub async fn get_value(&self, path: &str) -> Result<Option<Value>, ClientError> {
        Ok(self.transport()?.get(path).await?)
    }

    /// Sends an actuation command; the broker routes it to whichever
    /// provider owns the path.
    pub async fn set_target_value(
        &self,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<(), ClientError> {
        Ok(self.transport()?.actuate(path, value.into()).await?)
    }

    /// One-shot sensor value report.
    pub async fn publish_value(
        &self,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<(), ClientError> {
        Ok(self.transport()?.publish(path, value.into()).await?)
    }

    // =========================================================================
    // Typed operations
    // =========================================================================

    /// Reads a sensor's current value. A value of the wrong kind is a
    /// decode error, not `None`.
    pub async fn get<V: SignalValue>(
        &self,
        sensor: &Sensor<V>,
    ) -> Result<Option<V>, ClientError> {
        match self.get_value(sensor.path()).await? {
            Some(value) => Ok(Some(V::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Reads an attribute's value.
    pub async fn get_attribute<V: SignalValue>(
        &self,
        attribute: &Attribute<V>,
    ) -> Result<Option<V>, ClientError> {
        match self.get_value(attribute.path()).await? {
            Some(value) => Ok(Some(V::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Commands an actuator's target value.
    pub async fn set_target<V: SignalValue>(
        &self,
        actuator: &Actuator<V>,
        value: V,
    ) -> Result<(), ClientError> {
        self.set_target_value(actuator.path(), value.into_value())
            .await
    }

    /// Reports a sensor value.
    pub async fn publish<V: SignalValue>(
        &self,
        sensor: &Sensor<V>,
        value: V,
    ) -> Result<(), ClientError> {
        self.publish_value(sensor.path(), value.into_value()).await
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Registers a callback for updates to a path.
    ///
    /// All registrations must happen before [`Self::start_subscriptions`];
    /// the multiplexed stream lists only the paths known when it opens.
    pub fn subscribe_value(
        &self,
        path: impl Into<String>,
        callback: impl FnMut(Value) + Send + 'static,
    ) -> Result<(), ClientError> {
        if self.started {
            return Err(ClientError::SubscriptionsStarted);
        }
        let path = path.into();
        debug!(%path, "Registering subscription");
        self.subscriptions
            .lock()
            .unwrap()
            .insert(path, Box::new(callback));
        Ok(())
    }

    /// Registers a typed callback for a sensor. Updates whose value kind
    /// does not match are logged and skipped, never defaulted.
    pub fn subscribe<V: SignalValue>(
        &self,
        sensor: &Sensor<V>,
        mut callback: impl FnMut(V) + Send + 'static,
    ) -> Result<(), ClientError> {
        let path = sensor.path().to_string();
        self.subscribe_value(sensor.path(), move |value| match V::from_value(value) {
            Ok(typed) => callback(typed),
            Err(e) => warn!(%path, error = %e, "Dropping update of unexpected kind"),
        })
    }

    /// Opens the multiplexed stream for every registered path, delivers
    /// one initial value per path, then dispatches streamed updates until
    /// `disconnect`.
    pub async fn start_subscriptions(&mut self) -> Result<(), ClientError> {
        let transport = self.transport.as_ref().ok_or(ClientError::NotConnected)?;
        if self.started {
            warn!("Subscriptions already running");
            return Ok(());
        }

        let paths: Vec<String> = self.subscriptions.lock().unwrap().keys().cloned().collect();
        if paths.is_empty() {
            warn!("No subscriptions registered; nothing to start");
            return Ok(());
        }

        info!(count = paths.len(), "Starting subscription stream");
        let updates = transport.subscribe(paths.clone()).await?;

        // The stream is open but not yet consumed: initial reads land
        // before any streamed update can be dispatched.
        for path in &paths {
            match transport.get(path).await {
                Ok(Some(value)) => {
                    let mut table = self.subscriptions.lock().unwrap();
                    if let Some(callback) = table.get_mut(path) {
                        callback(value);
                    }
                }
                Ok(None) => debug!(%path, "No initial value available"),
                Err(e) => warn!(%path, error = %e, "Failed to read initial value"),
            }
        }

        self.token = CancellationToken::new();
        self.read_task = Some(tokio::spawn(dispatch_loop(
            updates,
            Arc::clone(&self.subscriptions),
            self.token.clone(),
        )));
        self.started = true;
        Ok(())
    }
}
