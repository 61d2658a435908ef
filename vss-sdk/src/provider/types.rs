//! Provider engine types.

use crate::broker::TransportError;
use crate::value::Value;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Callback invoked for each inbound actuation command, one at a time,
/// in strict arrival order. May block on hardware; the receipt ack has
/// already been written by the time it runs.
pub type ActuationCallback = dyn Fn(ActuationRequest) + Send + Sync;

/// One decoded inbound actuation command, consumed exactly once by the
/// actuation worker.
#[derive(Clone, Debug, PartialEq)]
pub struct ActuationRequest {
    pub path: String,
    pub signal_id: i32,
    pub value: Value,
}

/// One queued actual-value report, consumed exactly once by the publish
/// writer.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishRequest {
    pub path: String,
    pub value: Value,
}

/// Provider engine lifecycle.
///
/// `Failed` is reachable from `Connecting` and `Claiming`; a failed
/// engine must be stopped and recreated, claims are not resumable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Claiming,
    Confirmed,
    Streaming,
    Stopping,
    Stopped,
    Failed,
}

impl EngineState {
    /// True while the stream and workers are live.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// True once the engine can only be recreated, not restarted in place.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Claiming => "Claiming",
            Self::Confirmed => "Confirmed",
            Self::Streaming => "Streaming",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Errors surfaced by the provider engine.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No transport; `connect` must succeed before this operation.
    #[error("not connected to the databroker")]
    NotConnected,

    /// No ownership confirmation arrived within the claim window.
    #[error("timed out after {0:?} waiting for ownership confirmation")]
    ClaimTimeout(Duration),

    /// The stream ended before the broker confirmed ownership.
    #[error("ownership claim rejected by the databroker")]
    ClaimRejected,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
