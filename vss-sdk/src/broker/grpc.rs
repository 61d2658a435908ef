//! Tonic-backed broker transport.
//!
//! Connection semantics: establishing the channel is bounded by a short
//! connect timeout, then one lightweight unary probe confirms the broker
//! is actually serving. Only transport-level failures (unreachable,
//! deadline exceeded) fail the probe: the broker legitimately answers
//! "not found" for the probe path while being fully operational, and that
//! answer is proof of liveness.

use super::proto::pb::val_client::ValClient;
use super::proto::{datapoint_value, path_signal_id, pb, value_datapoint};
use super::transport::{BrokerTransport, ProviderSink, ProviderSource, UpdateStream};
use super::types::{MetadataEntry, StreamEvent, StreamFrame, TransportError};
use crate::value::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status, Streaming};
use tracing::{debug, info, warn};

/// Default bounded wait for channel establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default bounded wait for the liveness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default probe path: a signal most brokers know, but the probe accepts
/// any application-level answer for it.
pub const DEFAULT_PROBE_PATH: &str = "Vehicle.Speed";

/// Buffer for the outbound half of the provider stream.
const OUTBOUND_CHANNEL_CAPACITY: usize = 32;

/// Connection establishment settings.
#[derive(Clone, Debug)]
pub struct ConnectConfig {
    /// Bounded wait for transport-level reachability.
    pub connect_timeout: Duration,
    /// Bounded wait for the liveness probe response.
    pub probe_timeout: Duration,
    /// Signal path used by the liveness probe.
    pub probe_path: String,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
        }
    }
}

impl ConnectConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_probe_path(mut self, path: impl Into<String>) -> Self {
        self.probe_path = path.into();
        self
    }
}

fn map_status(status: Status) -> TransportError {
    match status.code() {
        Code::Unavailable => TransportError::Unreachable(status.message().to_string()),
        Code::DeadlineExceeded => TransportError::DeadlineExceeded(status.message().to_string()),
        _ => TransportError::Rpc(format!("{}: {}", status.code(), status.message())),
    }
}

/// A connected gRPC transport to the databroker.
#[derive(Clone)]
pub struct GrpcTransport {
    client: ValClient<Channel>,
}

impl GrpcTransport {
    /// Connects to the broker and verifies liveness.
    ///
    /// The address may omit the scheme; `http://` is assumed. Transport
    /// failures (unreachable, deadline exceeded) are connection failures;
    /// any application-level probe response counts as success.
    pub async fn connect(address: &str, config: &ConnectConfig) -> Result<Self, TransportError> {
        let uri = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };
        info!(address = %uri, "Connecting to databroker");

        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| TransportError::Unreachable(e.to_string()))?
            .connect_timeout(config.connect_timeout);

        let channel = tokio::time::timeout(config.connect_timeout, endpoint.connect())
            .await
            .map_err(|_| {
                TransportError::DeadlineExceeded(format!(
                    "no transport connection within {:?}",
                    config.connect_timeout
                ))
            })?
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let transport = Self {
            client: ValClient::new(channel),
        };
        transport.probe(config).await?;
        info!("Connected to databroker");
        Ok(transport)
    }

    /// One lightweight unary call proving the broker is serving.
    async fn probe(&self, config: &ConnectConfig) -> Result<(), TransportError> {
        let mut client = self.client.clone();
        let request = Request::new(pb::GetValueRequest {
            signal_id: Some(path_signal_id(&config.probe_path)),
        });

        let response = tokio::time::timeout(config.probe_timeout, client.get_value(request))
            .await
            .map_err(|_| {
                TransportError::DeadlineExceeded(format!(
                    "no probe response within {:?}",
                    config.probe_timeout
                ))
            })?;

        match response {
            Ok(_) => Ok(()),
            Err(status) => {
                let error = map_status(status);
                if error.is_connection_failure() {
                    Err(error)
                } else {
                    debug!(%error, "Probe answered with an application error; broker is alive");
                    Ok(())
                }
            }
        }
    }
}

impl BrokerTransport for GrpcTransport {
    type Sink = GrpcProviderSink;
    type Source = GrpcProviderSource;
    type Updates = GrpcUpdateStream;

    async fn get(&self, path: &str) -> Result<Option<Value>, TransportError> {
        let mut client = self.client.clone();
        let request = pb::GetValueRequest {
            signal_id: Some(path_signal_id(path)),
        };
        match client.get_value(request).await {
            Ok(response) => match response.into_inner().data_point {
                Some(datapoint) => datapoint_value(datapoint)
                    .map(Some)
                    .map_err(|e| TransportError::InvalidFrame(e.to_string())),
                None => Ok(None),
            },
            Err(status) if status.code() == Code::NotFound => Ok(None),
            Err(status) => Err(map_status(status)),
        }
    }

    async fn publish(&self, path: &str, value: Value) -> Result<(), TransportError> {
        let mut client = self.client.clone();
        let request = pb::PublishValueRequest {
            signal_id: Some(path_signal_id(path)),
            data_point: Some(value_datapoint(value)),
        };
        let response = client.publish_value(request).await.map_err(map_status)?;
        match response.into_inner().error {
            Some(error)
                if error.code != pb::ErrorCode::Ok as i32
                    && error.code != pb::ErrorCode::Unspecified as i32 =>
            {
                Err(TransportError::Rpc(error.message))
            }
            _ => Ok(()),
        }
    }

    async fn actuate(&self, path: &str, value: Value) -> Result<(), TransportError> {
        let mut client = self.client.clone();
        let request = pb::ActuateRequest {
            signal_id: Some(path_signal_id(path)),
            value: Some(value.into()),
        };
        client.actuate(request).await.map_err(map_status)?;
        Ok(())
    }

    async fn list_metadata(&self, root: &str) -> Result<Vec<MetadataEntry>, TransportError> {
        let mut client = self.client.clone();
        let request = pb::ListMetadataRequest {
            root: root.to_string(),
        };
        let response = client.list_metadata(request).await.map_err(map_status)?;
        Ok(response
            .into_inner()
            .metadata
            .into_iter()
            .map(MetadataEntry::from)
            .collect())
    }

    async fn open_provider_stream(
        &self,
    ) -> Result<(Self::Sink, Self::Source), TransportError> {
        let mut client = self.client.clone();
        let (tx, rx) = mpsc::channel::<pb::OpenProviderStreamRequest>(OUTBOUND_CHANNEL_CAPACITY);
        let outbound = ReceiverStream::new(rx);
        let response = client
            .open_provider_stream(Request::new(outbound))
            .await
            .map_err(map_status)?;
        Ok((
            GrpcProviderSink { tx: Some(tx) },
            GrpcProviderSource {
                inner: response.into_inner(),
            },
        ))
    }

    async fn subscribe(&self, paths: Vec<String>) -> Result<Self::Updates, TransportError> {
        let mut client = self.client.clone();
        let request = pb::SubscribeRequest {
            signal_paths: paths,
        };
        let response = client.subscribe(request).await.map_err(map_status)?;
        Ok(GrpcUpdateStream {
            inner: response.into_inner(),
        })
    }
}

/// Write half of the gRPC provider stream.
pub struct GrpcProviderSink {
    tx: Option<mpsc::Sender<pb::OpenProviderStreamRequest>>,
}

impl ProviderSink for GrpcProviderSink {
    async fn send(&mut self, frame: StreamFrame) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::StreamClosed)?;
        tx.send(frame.into())
            .await
            .map_err(|_| TransportError::StreamClosed)
    }

    async fn close(&mut self) {
        // Dropping the sender ends the outbound stream: a writes-done
        // half-close from the transport's point of view.
        self.tx.take();
    }
}

/// Read half of the gRPC provider stream.
pub struct GrpcProviderSource {
    inner: Streaming<pb::OpenProviderStreamResponse>,
}

impl ProviderSource for GrpcProviderSource {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, TransportError>> {
        match self.inner.message().await {
            Ok(Some(response)) => Some(StreamEvent::try_from(response)),
            Ok(None) => None,
            Err(status) => Some(Err(map_status(status))),
        }
    }
}

/// The multiplexed gRPC subscription stream.
pub struct GrpcUpdateStream {
    inner: Streaming<pb::SubscribeResponse>,
}

impl UpdateStream for GrpcUpdateStream {
    async fn next_update(&mut self) -> Option<Result<Vec<(String, Value)>, TransportError>> {
        match self.inner.message().await {
            Ok(Some(response)) => {
                let mut updates = Vec::with_capacity(response.entries.len());
                for (path, datapoint) in response.entries {
                    match datapoint_value(datapoint) {
                        Ok(value) => updates.push((path, value)),
                        Err(e) => {
                            warn!(%path, error = %e, "Dropping undecodable subscription update");
                        }
                    }
                }
                Some(Ok(updates))
            }
            Ok(None) => None,
            Err(status) => Some(Err(map_status(status))),
        }
    }
}
