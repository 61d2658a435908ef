//! Provider engine workers.
//!
//! Three workers per engine instance, spawned at `start()` and joined at
//! `stop()`: the receive worker and publish writer are tokio tasks; the
//! actuation worker is a dedicated thread because user callbacks may
//! block on hardware for arbitrarily long.

use super::types::{ActuationCallback, ActuationRequest, PublishRequest};
use crate::broker::{ProviderSink, ProviderSource, SignalSelector, StreamEvent, StreamFrame};
use crate::catalog::SignalCatalog;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Resolves the one-shot confirmation signal at most once. The broker
/// should send a single confirmation, but a duplicate (or the stream
/// ending after confirmation) must not panic the worker: later
/// resolution attempts are silently ignored.
fn resolve_confirmation(confirm: &mut Option<oneshot::Sender<bool>>, granted: bool) {
    if let Some(tx) = confirm.take() {
        let _ = tx.send(granted);
    }
}

/// Reads inbound frames until cancellation or stream end.
///
/// For each actuation command: resolve the numeric id (an id embedded in
/// the frame wins, otherwise the catalog is consulted by path), drop
/// unknown signals as non-fatal, write the receipt ack under the shared
/// write lock **before** the request is queued, then enqueue for the
/// actuation worker. Waiting for queue space here deliberately
/// backpressures stream consumption when the callback falls behind.
pub(super) async fn receive_worker<K, S>(
    mut source: S,
    sink: Arc<Mutex<K>>,
    catalog: Arc<SignalCatalog>,
    actuation_tx: mpsc::Sender<ActuationRequest>,
    confirm_tx: oneshot::Sender<bool>,
    token: CancellationToken,
) where
    K: ProviderSink,
    S: ProviderSource,
{
    debug!("Receive worker started");
    let mut confirm = Some(confirm_tx);

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                break;
            }

            event = source.next_event() => match event {
                None => {
                    // Stream ended. If the claim is still pending this is
                    // a rejection; mid-session it ends the provider role
                    // without any automatic reconnect.
                    resolve_confirmation(&mut confirm, false);
                    if !token.is_cancelled() {
                        warn!("Provider stream closed by the databroker");
                    }
                    break;
                }
                Some(Err(e)) => {
                    resolve_confirmation(&mut confirm, false);
                    if !token.is_cancelled() {
                        warn!(error = %e, "Provider stream failed");
                    }
                    break;
                }
                Some(Ok(StreamEvent::ClaimAccepted)) => {
                    info!("Ownership confirmation received");
                    resolve_confirmation(&mut confirm, true);
                }
                Some(Ok(StreamEvent::ActuateBatch(commands))) => {
                    debug!(count = commands.len(), "Received actuation batch");
                    let mut queue_closed = false;
                    for command in commands {
                        let resolved = match &command.selector {
                            SignalSelector::Id(id) => {
                                catalog.path_for_id(*id).map(|path| (path, *id))
                            }
                            SignalSelector::Path(path) => {
                                catalog.id_for_path(path).map(|id| (path.clone(), id))
                            }
                        };
                        let Some((path, signal_id)) = resolved else {
                            warn!(
                                selector = ?command.selector,
                                "Actuation command for a signal this provider does not own; dropping"
                            );
                            continue;
                        };

                        // Receipt ack goes out before the callback can
                        // run: a blocking callback must not starve the
                        // stream's liveness expectations.
                        {
                            let mut sink = sink.lock().await;
                            if let Err(e) = sink.send(StreamFrame::Ack { signal_id }).await {
                                warn!(error = %e, %path, "Failed to ack actuation command");
                            }
                        }

                        let request = ActuationRequest {
                            path,
                            signal_id,
                            value: command.value,
                        };
                        if actuation_tx.send(request).await.is_err() {
                            warn!("Actuation queue closed; stopping receive worker");
                            queue_closed = true;
                            break;
                        }
                    }
                    if queue_closed {
                        break;
                    }
                }
                Some(Ok(StreamEvent::PublishAck { errors })) => {
                    // Asynchronous per-signal outcomes: logged, never
                    // escalated to the publisher.
                    for (signal_id, error) in errors {
                        warn!(signal_id, code = error.code, message = %error.message,
                            "Databroker reported a publish error");
                    }
                }
            }
        }
    }

    // Whatever ended the loop, a still-pending claim is now a rejection.
    resolve_confirmation(&mut confirm, false);
    debug!("Receive worker stopped");
}

/// Drains the publish queue, resolving each path to its numeric id and
/// writing one frame per request under the shared write lock.
///
/// Returns the receiver so a later `start()` can reuse the queue.
pub(super) async fn publish_writer<K>(
    mut publish_rx: mpsc::Receiver<PublishRequest>,
    sink: Arc<Mutex<K>>,
    catalog: Arc<SignalCatalog>,
    token: CancellationToken,
) -> mpsc::Receiver<PublishRequest>
where
    K: ProviderSink,
{
    debug!("Publish writer started");

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                break;
            }

            request = publish_rx.recv() => match request {
                None => break,
                Some(PublishRequest { path, value }) => {
                    let Some(signal_id) = catalog.id_for_path(&path) else {
                        warn!(%path, "Cannot publish: signal id never resolved");
                        continue;
                    };
                    let frame = StreamFrame::Publish {
                        entries: HashMap::from([(signal_id, value)]),
                    };
                    let mut sink = sink.lock().await;
                    if let Err(e) = sink.send(frame).await {
                        warn!(error = %e, %path, "Failed to write publish frame");
                    }
                }
            }
        }
    }

    debug!("Publish writer stopped");
    publish_rx
}

/// Drains the actuation queue strictly FIFO on its own thread, invoking
/// the user callback synchronously one request at a time. No two
/// callbacks for one provider ever run concurrently. Shutdown is
/// cooperative: cancellation closes the producer side, which wakes the
/// blocking receive; the current callback always runs to completion.
pub(super) fn actuation_worker(
    mut actuation_rx: mpsc::Receiver<ActuationRequest>,
    callback: Option<Arc<ActuationCallback>>,
    token: CancellationToken,
) {
    debug!("Actuation worker started");

    while let Some(request) = actuation_rx.blocking_recv() {
        if token.is_cancelled() {
            break;
        }
        match &callback {
            Some(callback) => callback(request),
            None => {
                debug!(path = %request.path, "No actuation callback registered; dropping command")
            }
        }
    }

    debug!("Actuation worker stopped");
}
