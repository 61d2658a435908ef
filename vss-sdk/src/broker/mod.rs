//! Broker wire layer.
//!
//! This module separates protocol logic from the RPC framework. The engine
//! and facade speak in terms of the transport-agnostic frame model in
//! [`types`] through the traits in [`transport`]; [`grpc`] is the
//! tonic-backed production implementation of those traits.

pub mod grpc;
pub mod proto;
pub mod transport;
pub mod types;

pub use grpc::{ConnectConfig, GrpcTransport};
pub use transport::{BrokerTransport, ProviderSink, ProviderSource, UpdateStream};
pub use types::{
    ActuateCommand, MetadataEntry, PublishError, SignalSelector, StreamEvent, StreamFrame,
    TransportError,
};
