//! Capture host command surface
//!
//! The privileged host process enumerates sources, produces capture streams
//! and runs the sending half of each preview connection. [`HostBridge`] is
//! the seam the rest of the crate talks through; [`IpcHost`] implements it
//! over a Unix socket and [`HostServer`] exposes any bridge on one.

mod client;
mod protocol;
mod server;

pub use client::IpcHost;
pub use protocol::{HostReply, HostRequest};
pub use server::HostServer;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;
use crate::events::{HostEvent, Subscription};
use crate::types::{CaptureSource, IceCandidate, PreviewOffer, PreviewParams};

/// Commands the capture host accepts
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Enumerate monitors, rendering thumbnails at `params`
    async fn get_monitors(&self, params: PreviewParams) -> Result<Vec<CaptureSource>>;

    /// Enumerate windows, rendering thumbnails at `params`
    async fn get_windows(&self, params: PreviewParams) -> Result<Vec<CaptureSource>>;

    /// Snapshot of a single monitor
    async fn get_monitor_by_id(&self, id: &str, params: PreviewParams) -> Result<CaptureSource>;

    /// Snapshot of a single window
    async fn get_window_by_id(&self, id: &str, params: PreviewParams) -> Result<CaptureSource>;

    /// Begin producing a preview stream for a monitor
    async fn start_monitor_preview(&self, hmonitor: isize, params: PreviewParams) -> Result<()>;

    /// Begin producing a preview stream for a window
    async fn start_window_preview(&self, hwnd: isize, params: PreviewParams) -> Result<()>;

    /// Fetch the session offer for a started preview
    async fn get_preview_offer(&self, id: &str) -> Result<PreviewOffer>;

    /// Hand the local answer back to the host
    async fn accept_preview_answer(&self, id: &str, sdp: &str) -> Result<()>;

    /// Trickle one locally gathered candidate to the host
    async fn add_preview_ice_candidate(&self, id: &str, candidate: IceCandidate) -> Result<()>;

    /// Stop the preview stream and release host resources
    async fn stop_preview(&self, id: &str) -> Result<()>;

    /// Subscribe to host events
    async fn subscribe(&self) -> Result<Subscription<HostEvent>>;
}

/// Get the host socket path
///
/// Uses XDG_RUNTIME_DIR if available, otherwise /tmp
pub fn socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("glimpse-host.sock")
    } else {
        // SAFETY: getuid has no preconditions and cannot fail.
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/glimpse-host-{}.sock", uid))
    }
}
