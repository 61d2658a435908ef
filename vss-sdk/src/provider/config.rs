//! Provider engine configuration.

use std::time::Duration;

/// Default wait for the broker's ownership confirmation.
pub const DEFAULT_CLAIM_TIMEOUT: Duration = Duration::from_secs(5);

/// Default inbound command queue capacity. When full, the receive worker
/// waits for space, so a slow actuation callback backpressures stream
/// consumption instead of growing the queue without bound.
pub const DEFAULT_ACTUATION_QUEUE_CAPACITY: usize = 256;

/// Default outbound publish queue capacity. `publish_actual` never blocks
/// its caller; reports beyond capacity are dropped with a warning.
pub const DEFAULT_PUBLISH_QUEUE_CAPACITY: usize = 256;

/// Configuration for [`super::ActuatorProvider`].
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Wait for the ownership confirmation after sending the claim.
    pub claim_timeout: Duration,

    /// Inbound command queue capacity.
    pub actuation_queue_capacity: usize,

    /// Outbound publish queue capacity.
    pub publish_queue_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            claim_timeout: DEFAULT_CLAIM_TIMEOUT,
            actuation_queue_capacity: DEFAULT_ACTUATION_QUEUE_CAPACITY,
            publish_queue_capacity: DEFAULT_PUBLISH_QUEUE_CAPACITY,
        }
    }
}

impl ProviderConfig {
    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    pub fn with_actuation_queue_capacity(mut self, capacity: usize) -> Self {
        self.actuation_queue_capacity = capacity;
        self
    }

    pub fn with_publish_queue_capacity(mut self, capacity: usize) -> Self {
        self.publish_queue_capacity = capacity;
        self
    }
}
