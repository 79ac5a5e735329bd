//! IPC server exposing a [`HostBridge`] on a Unix socket
//!
//! Capture hosts built on this crate serve their bridge through it; the
//! integration tests use it to drive [`super::IpcHost`] end to end.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::HostBridge;
use super::protocol::{HostReply, HostRequest};
use crate::error::{GlimpseError, Result};
use crate::types::IceCandidate;

/// Socket server dispatching host commands to a bridge
pub struct HostServer {
    /// Path to the Unix socket
    socket_path: PathBuf,
    /// Listener for incoming connections
    listener: Option<UnixListener>,
    /// Bridge the commands are dispatched to
    bridge: Arc<dyn HostBridge>,
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
}

impl HostServer {
    /// Create a server for `bridge` at `socket_path`
    pub fn new(bridge: Arc<dyn HostBridge>, socket_path: impl Into<PathBuf>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            socket_path: socket_path.into(),
            listener: None,
            bridge,
            shutdown_tx,
        }
    }

    /// Socket path this server binds
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Bind the socket
    pub async fn start(&mut self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| {
                GlimpseError::ipc(format!("Failed to remove old socket: {}", e))
            })?;
        }

        if let Some(parent) = self.socket_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GlimpseError::ipc(format!("Failed to create socket directory: {}", e))
                })?;
            }
        }

        let listener = UnixListener::bind(&self.socket_path).map_err(|e| {
            GlimpseError::ipc(format!(
                "Failed to bind socket at {:?}: {}",
                self.socket_path, e
            ))
        })?;

        // Owner-only: the host hands out capture streams
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&self.socket_path, permissions).map_err(|e| {
            warn!("Failed to set socket permissions: {}", e);
            GlimpseError::ipc(format!("Failed to set socket permissions: {}", e))
        })?;

        info!("Host server listening on {:?}", self.socket_path);
        self.listener = Some(listener);

        Ok(())
    }

    /// Handle used to stop [`HostServer::run`]
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Accept connections until shut down; each connection gets its own task
    pub async fn run(&self) -> Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| GlimpseError::ipc("Server not started"))?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Host server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        debug!("Host client connected");
                        let bridge = self.bridge.clone();
                        tokio::spawn(handle_connection(bridge, stream));
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }
    }

    /// Clean up the socket file
    pub fn cleanup(&self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            } else {
                debug!("Removed socket file {:?}", self.socket_path);
            }
        }
    }
}

impl Drop for HostServer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

async fn handle_connection(bridge: Arc<dyn HostBridge>, stream: UnixStream) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Host client disconnected");
                return;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match HostRequest::from_bytes(trimmed.as_bytes()) {
                    Ok(HostRequest::Subscribe) => {
                        stream_events(bridge.as_ref(), reader, writer).await;
                        return;
                    }
                    Ok(request) => {
                        let reply = dispatch(bridge.as_ref(), request).await;
                        if let Err(e) = writer.write_all(&reply.to_bytes()).await {
                            error!("Failed to send host reply: {}", e);
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Invalid host request: {}", e);
                        let reply = HostReply::error(format!("Invalid request: {}", e));
                        let _ = writer.write_all(&reply.to_bytes()).await;
                    }
                }
            }
            Err(e) => {
                error!("Error reading from host client: {}", e);
                return;
            }
        }
    }
}

/// Forward bridge events until either side goes away
async fn stream_events(
    bridge: &dyn HostBridge,
    mut reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
) {
    let mut subscription = match bridge.subscribe().await {
        Ok(sub) => sub,
        Err(e) => {
            let _ = writer.write_all(&HostReply::from_error(&e).to_bytes()).await;
            return;
        }
    };

    let mut discard = String::new();
    loop {
        tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => {
                    let reply = HostReply::Event { event };
                    if writer.write_all(&reply.to_bytes()).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            read = reader.read_line(&mut discard) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => discard.clear(),
            },
        }
    }

    debug!("Event subscriber detached");
}

/// Run one request against the bridge
async fn dispatch(bridge: &dyn HostBridge, request: HostRequest) -> HostReply {
    let command = request.command();
    let params = request.params().unwrap_or_default();

    let result = match request {
        HostRequest::GetMonitors { .. } => bridge
            .get_monitors(params)
            .await
            .map(|sources| HostReply::Sources { sources }),
        HostRequest::GetWindows { .. } => bridge
            .get_windows(params)
            .await
            .map(|sources| HostReply::Sources { sources }),
        HostRequest::GetMonitorById { id, .. } => bridge
            .get_monitor_by_id(&id, params)
            .await
            .map(|source| HostReply::Source { source }),
        HostRequest::GetWindowById { id, .. } => bridge
            .get_window_by_id(&id, params)
            .await
            .map(|source| HostReply::Source { source }),
        HostRequest::StartMonitorPreview { hmonitor, .. } => bridge
            .start_monitor_preview(hmonitor, params)
            .await
            .map(|_| HostReply::Ok),
        HostRequest::StartWindowPreview { hwnd, .. } => bridge
            .start_window_preview(hwnd, params)
            .await
            .map(|_| HostReply::Ok),
        HostRequest::GetPreviewOffer { id } => bridge
            .get_preview_offer(&id)
            .await
            .map(|offer| HostReply::Offer { offer }),
        HostRequest::AcceptPreviewAnswer { id, sdp } => bridge
            .accept_preview_answer(&id, &sdp)
            .await
            .map(|_| HostReply::Ok),
        HostRequest::AddPreviewIceCandidate {
            id,
            candidate,
            sdp_mid,
            sdp_mline_index,
        } => bridge
            .add_preview_ice_candidate(
                &id,
                IceCandidate {
                    candidate,
                    sdp_mid,
                    sdp_mline_index,
                },
            )
            .await
            .map(|_| HostReply::Ok),
        HostRequest::StopPreview { id } => bridge.stop_preview(&id).await.map(|_| HostReply::Ok),
        HostRequest::Subscribe => Ok(HostReply::error("subscribe must be the first request")),
    };

    match result {
        Ok(reply) => reply,
        Err(e) => {
            warn!("{} failed: {}", command, e);
            HostReply::from_error(&e)
        }
    }
}
