//! Transport-agnostic wire model.
//!
//! One persistent bidirectional stream per provider session carries three
//! frame kinds in each direction, modelled here as [`StreamFrame`]
//! (client to server) and [`StreamEvent`] (server to client). The shapes
//! mirror the broker's protobuf envelope exactly; only the encoding is
//! left to the transport implementation.

use crate::value::{Value, ValueKind};
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker could not be reached at the transport level.
    #[error("broker unreachable: {0}")]
    Unreachable(String),

    /// A bounded wait for the broker elapsed.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The stream was closed by the peer or is no longer writable.
    #[error("stream closed")]
    StreamClosed,

    /// The broker answered an RPC with an application-level error.
    #[error("rpc failed: {0}")]
    Rpc(String),

    /// An inbound frame could not be decoded into the model.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

impl TransportError {
    /// Whether this error proves the broker is unreachable rather than
    /// merely unhappy. The connection probe fails only on these: an
    /// application-level error (even "not found") is proof of liveness.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::DeadlineExceeded(_))
    }
}

/// A signal metadata entry as returned by the broker's listing query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataEntry {
    pub id: i32,
    pub path: String,
    pub data_type: Option<ValueKind>,
}

/// Identifies a signal in an inbound command frame: the broker may send
/// either the numeric id or the path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalSelector {
    Id(i32),
    Path(String),
}

/// One actuation command from an inbound batch.
#[derive(Clone, Debug, PartialEq)]
pub struct ActuateCommand {
    pub selector: SignalSelector,
    pub value: Value,
}

/// A per-signal error from a publish acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishError {
    pub code: i32,
    pub message: String,
}

/// Outbound provider-stream frames (client to server).
#[derive(Clone, Debug, PartialEq)]
pub enum StreamFrame {
    /// Ownership claim listing every actuator path this session owns.
    Claim { paths: Vec<String> },

    /// Receipt acknowledgement for one actuation command. Receipt only,
    /// never success: no error payload is populated.
    Ack { signal_id: i32 },

    /// Actual-value report for one or more owned signals, keyed by id.
    Publish { entries: HashMap<i32, Value> },
}

/// Inbound provider-stream frames (server to client).
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// The broker granted the ownership claim.
    ClaimAccepted,

    /// A batch of actuation commands for owned signals.
    ActuateBatch(Vec<ActuateCommand>),

    /// Asynchronous per-signal outcome of earlier publishes. Only
    /// entries with a non-OK code are reported.
    PublishAck { errors: HashMap<i32, PublishError> },
}
