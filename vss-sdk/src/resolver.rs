//! Path to numeric-id resolution.
//!
//! The broker's metadata listing is the only source of numeric ids. The
//! resolver queries the listing for a path and scans for an exact match.
//! Resolution failures are deliberately non-fatal at registration time:
//! the id simply stays unknown and operations that require it (publish,
//! ack correlation) fail per-call instead. Failing fast at registration
//! would arguably be safer, but per-call failure keeps a partially-known
//! signal set usable.

use crate::broker::{BrokerTransport, MetadataEntry, TransportError};
use crate::catalog::SignalCatalog;
use tracing::{info, warn};

/// Scans a metadata listing for an exact path match.
fn find_exact(entries: &[MetadataEntry], path: &str) -> Option<i32> {
    entries.iter().find(|entry| entry.path == path).map(|entry| entry.id)
}

/// Resolves a single path to its broker-internal numeric id.
///
/// `Ok(None)` means the broker answered but listed no entry for the
/// exact path.
pub async fn resolve_signal_id<T: BrokerTransport>(
    transport: &T,
    path: &str,
) -> Result<Option<i32>, TransportError> {
    let entries = transport.list_metadata(path).await?;
    Ok(find_exact(&entries, path))
}

/// Resolves a set of paths into the catalog, logging and skipping any
/// that fail. Returns how many resolved.
pub async fn register_paths<T: BrokerTransport>(
    transport: &T,
    catalog: &SignalCatalog,
    paths: &[String],
) -> usize {
    let mut resolved = 0;
    for path in paths {
        match resolve_signal_id(transport, path).await {
            Ok(Some(id)) => {
                catalog.insert(path.clone(), id);
                info!(%path, id, "Resolved signal id");
                resolved += 1;
            }
            Ok(None) => {
                warn!(%path, "No metadata entry for path; id stays unresolved");
            }
            Err(e) => {
                warn!(%path, error = %e, "Signal id query failed; id stays unresolved");
            }
        }
    }
    resolved
}
