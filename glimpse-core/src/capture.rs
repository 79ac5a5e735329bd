//! Screen capture facade
//!
//! One object a UI or CLI holds for the lifetime of a source picker: source
//! lists, preview start/negotiate/stop, and teardown of everything on exit.
//!
//! ```text
//! ScreenCapture
//!   ├── SourceRegistry    (get_monitors / get_windows)
//!   ├── PreviewNegotiator (start → offer → answer → ICE)
//!   └── PreviewLifecycle  (id → endpoint, stop, teardown)
//! ```

use std::sync::Arc;
use tracing::info;

use crate::config::RetryPolicy;
use crate::endpoint::EndpointFactory;
use crate::error::Result;
use crate::host::HostBridge;
use crate::lifecycle::PreviewLifecycle;
use crate::negotiator::PreviewNegotiator;
use crate::registry::SourceRegistry;
use crate::sink::PlaybackSink;
use crate::types::{CaptureSource, NativeHandle, PreviewParams};

/// Source listing and live previews over one host
pub struct ScreenCapture {
    host: Arc<dyn HostBridge>,
    registry: SourceRegistry,
    negotiator: PreviewNegotiator,
    lifecycle: PreviewLifecycle,
}

impl ScreenCapture {
    /// Create a facade with trickle ICE on and no retries
    pub fn new(host: Arc<dyn HostBridge>, factory: Arc<dyn EndpointFactory>) -> Self {
        Self::from_parts(host.clone(), PreviewNegotiator::new(host, factory))
    }

    /// Create a facade around a preconfigured negotiator
    pub fn from_parts(host: Arc<dyn HostBridge>, negotiator: PreviewNegotiator) -> Self {
        Self {
            registry: SourceRegistry::new(host.clone()),
            negotiator,
            lifecycle: PreviewLifecycle::new(),
            host,
        }
    }

    /// Change the retry policy used by [`ScreenCapture::preview`]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.negotiator = self.negotiator.with_retry(retry);
        self
    }

    /// The host this facade talks to
    pub fn host(&self) -> &Arc<dyn HostBridge> {
        &self.host
    }

    pub fn monitors(&self) -> Vec<CaptureSource> {
        self.registry.monitors()
    }

    pub fn windows(&self) -> Vec<CaptureSource> {
        self.registry.windows()
    }

    pub fn is_loading(&self) -> bool {
        self.registry.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.registry.last_error()
    }

    pub async fn fetch_monitors(&self, params: PreviewParams) -> Result<Vec<CaptureSource>> {
        self.registry.fetch_monitors(params).await
    }

    pub async fn fetch_windows(&self, params: PreviewParams) -> Result<Vec<CaptureSource>> {
        self.registry.fetch_windows(params).await
    }

    pub async fn get_monitor_by_id(
        &self,
        id: &str,
        params: PreviewParams,
    ) -> Result<CaptureSource> {
        self.registry.get_monitor_by_id(id, params).await
    }

    pub async fn get_window_by_id(&self, id: &str, params: PreviewParams) -> Result<CaptureSource> {
        self.registry.get_window_by_id(id, params).await
    }

    pub async fn get_source_by_id(&self, id: &str, params: PreviewParams) -> Result<CaptureSource> {
        self.registry.get_source_by_id(id, params).await
    }

    pub async fn start_monitor_preview(
        &self,
        hmonitor: isize,
        params: PreviewParams,
    ) -> Result<()> {
        self.negotiator.start_monitor_preview(hmonitor, params).await
    }

    pub async fn start_window_preview(&self, hwnd: isize, params: PreviewParams) -> Result<()> {
        self.negotiator.start_window_preview(hwnd, params).await
    }

    /// Start the host stream for a source id
    pub async fn start_preview(&self, id: &str, params: PreviewParams) -> Result<NativeHandle> {
        self.negotiator.start_preview(id, params).await
    }

    /// Negotiate a connection for an already started preview and register it
    ///
    /// A connection previously registered for `id` is closed once the new one
    /// is in place. On failure nothing is registered.
    pub async fn setup_preview_connection(
        &self,
        id: &str,
        sink: Arc<dyn PlaybackSink>,
    ) -> Result<()> {
        let endpoint = self.negotiator.negotiate(id, sink).await?;
        self.lifecycle.register(id, endpoint).await;
        Ok(())
    }

    /// Start and negotiate a preview in one go
    pub async fn preview(
        &self,
        id: &str,
        params: PreviewParams,
        sink: Arc<dyn PlaybackSink>,
    ) -> Result<()> {
        let endpoint = self.negotiator.preview_with_retry(id, params, sink).await?;
        self.lifecycle.register(id, endpoint).await;
        info!("Preview active for {}", id);
        Ok(())
    }

    /// Stop a preview on the host and drop its local connection
    pub async fn stop_preview(&self, id: &str) -> Result<()> {
        self.lifecycle.stop(self.host.as_ref(), id).await
    }

    /// Close every local connection
    pub async fn teardown(&self) {
        self.lifecycle.teardown().await;
    }

    /// Whether `id` has a live connection
    pub fn is_active(&self, id: &str) -> bool {
        self.lifecycle.contains(id)
    }

    /// Ids with a live connection, sorted
    pub fn active_ids(&self) -> Vec<String> {
        self.lifecycle.active_ids()
    }
}
