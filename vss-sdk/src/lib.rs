//! VSS SDK - Client library for the vehicle signal databroker.
//!
//! Two roles are supported over the broker's `kuksa.val.v2` protocol:
//!
//! - **Client** ([`client::VssClient`]): observe and command signals
//!   with unary get/set/publish plus one multiplexed subscription stream.
//! - **Provider** ([`provider::ActuatorProvider`]): claim exclusive
//!   ownership of actuator paths and receive their commands over a
//!   persistent bidirectional stream, reporting actual values back.
//!
//! # Example
//!
//! ```ignore
//! use vss_sdk::provider::ActuatorProvider;
//!
//! let mut provider = ActuatorProvider::new("127.0.0.1:55555");
//! provider.connect().await?;
//! provider.provide_actuators(&["Vehicle.Cabin.HVAC.IsAirConditioningActive"]).await?;
//! provider.on_actuate_request(|request| {
//!     println!("commanded: {} = {}", request.path, request.value);
//! });
//! provider.start().await?;
//! ```

pub mod broker;
pub mod catalog;
pub mod client;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod signal;
pub mod value;

pub use broker::{ConnectConfig, GrpcTransport};
pub use catalog::SignalCatalog;
pub use client::{ClientError, VssClient};
pub use provider::{ActuatorProvider, ProviderConfig, ProviderError};
pub use signal::{Actuator, Attribute, Sensor, SignalRef};
pub use value::{SignalValue, Value, ValueError, ValueKind};

/// Version of the VSS SDK library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
