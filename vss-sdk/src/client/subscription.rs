//! Subscription table and dispatch loop.
//!
//! Many subscriptions share one multiplexed stream and one read task.
//! Every callback runs synchronously on that task, so a slow callback
//! delays delivery for all other subscriptions, the same single-consumer
//! tradeoff the provider's actuation worker makes, mirrored here on
//! purpose.

use crate::broker::UpdateStream;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A registered per-path update callback.
pub type SubscriptionCallback = Box<dyn FnMut(Value) + Send>;

/// Path to callback registrations, shared between the facade and the
/// read task.
pub(super) type SubscriptionTable = Arc<Mutex<HashMap<String, SubscriptionCallback>>>;

/// Reads update batches until cancellation or stream end, dispatching
/// each (path, value) pair to its callback under the table lock. Updates
/// for unregistered paths are ignored without error.
pub(super) async fn dispatch_loop<U: UpdateStream>(
    mut updates: U,
    table: SubscriptionTable,
    token: CancellationToken,
) {
    debug!("Subscription dispatcher started");

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                break;
            }

            batch = updates.next_update() => match batch {
                None => {
                    info!("Subscription stream ended");
                    break;
                }
                Some(Err(e)) => {
                    if !token.is_cancelled() {
                        warn!(error = %e, "Subscription stream failed");
                    }
                    break;
                }
                Some(Ok(entries)) => {
                    for (path, value) in entries {
                        let mut table = table.lock().unwrap();
                        match table.get_mut(&path) {
                            Some(callback) => callback(value),
                            None => debug!(%path, "Update for unregistered path; ignoring"),
                        }
                    }
                }
            }
        }
    }

    debug!("Subscription dispatcher stopped");
}
