//! Active preview connections
//!
//! Owns the map from source id to negotiated endpoint. Only fully negotiated
//! endpoints are ever registered; a source that is still negotiating has no
//! entry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::endpoint::PeerEndpoint;
use crate::error::Result;
use crate::host::HostBridge;

/// Tracks one live connection per source id
pub struct PreviewLifecycle {
    connections: Mutex<HashMap<String, Arc<dyn PeerEndpoint>>>,
}

impl PreviewLifecycle {
    /// Create an empty lifecycle manager
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Register a negotiated connection, closing any previous one for `id`
    ///
    /// The new connection replaces the old one in a single swap, and the old
    /// one is closed right after. The map never holds two entries for `id`.
    pub async fn register(&self, id: &str, endpoint: Arc<dyn PeerEndpoint>) {
        let previous = self.connections.lock().insert(id.to_string(), endpoint);

        if let Some(previous) = previous {
            info!("Preview for {} superseded, closing previous connection", id);
            if let Err(e) = previous.close().await {
                warn!("Failed to close superseded connection for {}: {}", id, e);
            }
        }
    }

    /// Stop a preview on the host and drop the local connection
    ///
    /// Local cleanup happens even when the host rejects the stop; the host
    /// error is returned afterwards.
    pub async fn stop(&self, host: &dyn HostBridge, id: &str) -> Result<()> {
        let host_result = host.stop_preview(id).await;

        let endpoint = self.connections.lock().remove(id);
        match endpoint {
            Some(endpoint) => {
                if let Err(e) = endpoint.close().await {
                    warn!("Failed to close connection for {}: {}", id, e);
                }
                debug!("Removed preview connection for {}", id);
            }
            None => debug!("No local connection for {}", id),
        }

        if let Err(e) = &host_result {
            warn!("Failed to stop preview {}: {}", id, e);
        }
        host_result
    }

    /// Close every connection and clear the map
    ///
    /// Close failures are logged and do not stop the sweep.
    pub async fn teardown(&self) {
        let drained: Vec<(String, Arc<dyn PeerEndpoint>)> =
            self.connections.lock().drain().collect();

        if drained.is_empty() {
            return;
        }

        info!("Tearing down {} preview connection(s)", drained.len());
        for (id, endpoint) in drained {
            if let Err(e) = endpoint.close().await {
                warn!("Failed to close connection for {}: {}", id, e);
            }
        }
    }

    /// Whether `id` has a live connection
    pub fn contains(&self, id: &str) -> bool {
        self.connections.lock().contains_key(id)
    }

    /// Ids with a live connection, sorted
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.connections.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Whether no connection is live
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

impl Default for PreviewLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PreviewLifecycle {
    fn drop(&mut self) {
        let drained: Vec<(String, Arc<dyn PeerEndpoint>)> =
            self.connections.get_mut().drain().collect();
        if drained.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for (id, endpoint) in drained {
                        if let Err(e) = endpoint.close().await {
                            warn!("Failed to close connection for {} on drop: {}", id, e);
                        }
                    }
                });
            }
            Err(_) => warn!(
                "Dropped {} preview connection(s) outside a runtime without closing",
                drained.len()
            ),
        }
    }
}
