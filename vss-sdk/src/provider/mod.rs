//! Actuator-ownership provider engine.
//!
//! A provider claims exclusive ownership of one or more actuator paths
//! over a single persistent bidirectional stream and is thereafter the
//! sole recipient of commands for them. The engine runs a fixed set of
//! long-lived workers per instance:
//!
//! - the **receive worker** demultiplexes inbound frames (confirmation,
//!   command batches, publish acknowledgements),
//! - the **actuation worker** drains the command queue strictly FIFO on a
//!   dedicated thread so user callbacks may block on hardware,
//! - the **publish writer** drains the outbound actual-value queue.
//!
//! Every outbound frame, regardless of origin, is serialized through one
//! stream-write lock: the transport does not tolerate concurrent writers.

mod config;
mod engine;
mod types;
mod worker;

pub use config::{
    ProviderConfig, DEFAULT_ACTUATION_QUEUE_CAPACITY, DEFAULT_CLAIM_TIMEOUT,
    DEFAULT_PUBLISH_QUEUE_CAPACITY,
};
pub use engine::{ActuatorProvider, PublishHandle};
pub use types::{ActuationCallback, ActuationRequest, EngineState, ProviderError, PublishRequest};
