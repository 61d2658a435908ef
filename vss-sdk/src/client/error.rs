//! Client error types.

use crate::broker::TransportError;
use crate::value::ValueError;
use thiserror::Error;

/// Errors surfaced by the client facade.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No transport; `connect` must succeed before this operation.
    #[error("not connected to the databroker")]
    NotConnected,

    /// Registration after `start_subscriptions` is unsupported: the
    /// multiplexed stream lists only the paths known when it opened.
    #[error("subscriptions already started; register before start_subscriptions")]
    SubscriptionsStarted,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Value(#[from] ValueError),
}
