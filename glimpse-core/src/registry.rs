//! Source enumeration
//!
//! Keeps the last successfully fetched monitor and window lists. A failed
//! fetch leaves the previous list in place and records the error text so a
//! picker can show both.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{GlimpseError, Result};
use crate::host::HostBridge;
use crate::types::{CaptureSource, NativeHandle, PreviewParams, SourceType};

/// Cached view of the host's capture sources
pub struct SourceRegistry {
    host: Arc<dyn HostBridge>,
    monitors: RwLock<Vec<CaptureSource>>,
    windows: RwLock<Vec<CaptureSource>>,
    in_flight: AtomicUsize,
    last_error: RwLock<Option<String>>,
}

impl SourceRegistry {
    /// Create an empty registry talking to `host`
    pub fn new(host: Arc<dyn HostBridge>) -> Self {
        Self {
            host,
            monitors: RwLock::new(Vec::new()),
            windows: RwLock::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            last_error: RwLock::new(None),
        }
    }

    /// Last successfully fetched monitors
    pub fn monitors(&self) -> Vec<CaptureSource> {
        self.monitors.read().clone()
    }

    /// Last successfully fetched windows
    pub fn windows(&self) -> Vec<CaptureSource> {
        self.windows.read().clone()
    }

    /// Whether any fetch is running
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// Message of the most recent failed fetch, cleared when a new one starts
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Refresh the monitor list
    pub async fn fetch_monitors(&self, params: PreviewParams) -> Result<Vec<CaptureSource>> {
        self.fetch(SourceType::Monitor, params).await
    }

    /// Refresh the window list
    pub async fn fetch_windows(&self, params: PreviewParams) -> Result<Vec<CaptureSource>> {
        self.fetch(SourceType::Window, params).await
    }

    async fn fetch(&self, kind: SourceType, params: PreviewParams) -> Result<Vec<CaptureSource>> {
        *self.last_error.write() = None;
        let _loading = LoadingGuard::enter(&self.in_flight);

        let result = match kind {
            SourceType::Monitor => self.host.get_monitors(params).await,
            SourceType::Window => self.host.get_windows(params).await,
        };

        match result {
            Ok(sources) => {
                debug!("Fetched {} {} source(s)", sources.len(), kind);
                let slot = match kind {
                    SourceType::Monitor => &self.monitors,
                    SourceType::Window => &self.windows,
                };
                *slot.write() = sources.clone();
                Ok(sources)
            }
            Err(e) => {
                warn!("Failed to fetch {} sources: {}", kind, e);
                let message = match e.root() {
                    GlimpseError::Host(message) => message.clone(),
                    _ => e.to_string(),
                };
                *self.last_error.write() = Some(message);
                Err(e)
            }
        }
    }

    /// Fresh snapshot of one monitor
    pub async fn get_monitor_by_id(
        &self,
        id: &str,
        params: PreviewParams,
    ) -> Result<CaptureSource> {
        self.host
            .get_monitor_by_id(id, params)
            .await
            .inspect_err(|e| warn!("Failed to get monitor {}: {}", id, e))
    }

    /// Fresh snapshot of one window
    pub async fn get_window_by_id(&self, id: &str, params: PreviewParams) -> Result<CaptureSource> {
        self.host
            .get_window_by_id(id, params)
            .await
            .inspect_err(|e| warn!("Failed to get window {}: {}", id, e))
    }

    /// Fresh snapshot of whatever `id` refers to
    pub async fn get_source_by_id(&self, id: &str, params: PreviewParams) -> Result<CaptureSource> {
        match NativeHandle::parse(id)?.source_type() {
            SourceType::Monitor => self.get_monitor_by_id(id, params).await,
            SourceType::Window => self.get_window_by_id(id, params).await,
        }
    }
}

/// Counts a fetch as running until dropped
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_guard_counts() {
        let counter = AtomicUsize::new(0);
        {
            let _a = LoadingGuard::enter(&counter);
            let _b = LoadingGuard::enter(&counter);
            assert_eq!(counter.load(Ordering::Acquire), 2);
        }
        assert_eq!(counter.load(Ordering::Acquire), 0);
    }
}
