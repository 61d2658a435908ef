//! Transport traits: the seam between protocol logic and the RPC stack.
//!
//! The provider engine and client facade are generic over these traits so
//! the handshake, ordering, and shutdown logic can be exercised against
//! in-memory implementations. [`super::grpc::GrpcTransport`] is the
//! production implementation.

use super::types::{MetadataEntry, StreamEvent, StreamFrame, TransportError};
use crate::value::Value;
use std::future::Future;

/// A connected broker transport: unary dispatch plus stream opening.
pub trait BrokerTransport: Send + Sync + 'static {
    /// Write half of the provider stream.
    type Sink: ProviderSink;
    /// Read half of the provider stream.
    type Source: ProviderSource;
    /// The multiplexed subscription update stream.
    type Updates: UpdateStream;

    /// Reads the current value of a signal. `Ok(None)` means the broker
    /// answered but knows no value for the path.
    fn get(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<Value>, TransportError>> + Send;

    /// One-shot sensor value report (fire-and-forget from the caller's
    /// perspective, but the unary response surfaces broker rejections).
    fn publish(
        &self,
        path: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Routes an actuation command to whichever provider owns the path.
    fn actuate(
        &self,
        path: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Lists signal metadata under a root path.
    fn list_metadata(
        &self,
        root: &str,
    ) -> impl Future<Output = Result<Vec<MetadataEntry>, TransportError>> + Send;

    /// Opens the persistent bidirectional provider stream.
    fn open_provider_stream(
        &self,
    ) -> impl Future<Output = Result<(Self::Sink, Self::Source), TransportError>> + Send;

    /// Opens one server stream multiplexing updates for all given paths.
    fn subscribe(
        &self,
        paths: Vec<String>,
    ) -> impl Future<Output = Result<Self::Updates, TransportError>> + Send;
}

/// Write half of the provider stream.
///
/// The transport does not tolerate concurrent writers; callers serialize
/// every send through one shared lock. The sink itself therefore only
/// needs `&mut` access.
pub trait ProviderSink: Send + 'static {
    fn send(
        &mut self,
        frame: StreamFrame,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Graceful half-close: signals writes-done to the peer. Subsequent
    /// sends fail with [`TransportError::StreamClosed`].
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Read half of the provider stream.
pub trait ProviderSource: Send + 'static {
    /// Next inbound event; `None` once the stream has ended.
    fn next_event(
        &mut self,
    ) -> impl Future<Output = Option<Result<StreamEvent, TransportError>>> + Send;
}

/// The multiplexed subscription stream.
pub trait UpdateStream: Send + 'static {
    /// Next batch of (path, value) updates; `None` once the stream ends.
    fn next_update(
        &mut self,
    ) -> impl Future<Output = Option<Result<Vec<(String, Value)>, TransportError>>> + Send;
}
