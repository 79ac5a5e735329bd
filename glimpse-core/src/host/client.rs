//! IPC client for the capture host
//!
//! Each command opens its own connection so a slow reply for one source
//! never holds up commands for another.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::protocol::{HostReply, HostRequest};
use super::{HostBridge, socket_path};
use crate::error::{GlimpseError, Result};
use crate::events::{HostEvent, Subscription};
use crate::types::{CaptureSource, IceCandidate, PreviewOffer, PreviewParams};

/// Default connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Events buffered per subscription
const EVENT_BUFFER: usize = 32;

/// [`HostBridge`] over the host's Unix socket
#[derive(Debug, Clone)]
pub struct IpcHost {
    path: PathBuf,
    connect_timeout: Duration,
}

impl IpcHost {
    /// Talk to the host at the default socket path
    pub fn new() -> Self {
        Self::with_path(socket_path())
    }

    /// Talk to the host at a specific socket path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Override the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Socket path in use
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn connect(&self) -> Result<UnixStream> {
        let stream = tokio::time::timeout(self.connect_timeout, UnixStream::connect(&self.path))
            .await
            .map_err(|_| GlimpseError::ipc("Connection timed out"))?
            .map_err(|e| {
                GlimpseError::ipc(format!("Failed to connect to host at {:?}: {}", self.path, e))
            })?;

        trace!("Connected to host at {:?}", self.path);
        Ok(stream)
    }

    /// Send one request and wait for its reply
    ///
    /// Replies are awaited without a deadline; a stalled host stalls only
    /// this call.
    async fn send(&self, request: HostRequest) -> Result<HostReply> {
        let mut stream = self.connect().await?;
        let (reader, mut writer) = stream.split();

        debug!("-> {}", request.command());
        writer
            .write_all(&request.to_bytes())
            .await
            .map_err(|e| GlimpseError::ipc(format!("Failed to send request: {}", e)))?;

        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| GlimpseError::ipc(format!("Failed to read reply: {}", e)))?;

        if n == 0 {
            return Err(GlimpseError::ipc("Host closed the connection without replying"));
        }

        match HostReply::from_bytes(line.trim().as_bytes()) {
            Ok(HostReply::Error { message }) => Err(GlimpseError::Host(message)),
            Ok(reply) => Ok(reply),
            Err(e) => Err(GlimpseError::ipc(format!("Invalid reply: {}", e))),
        }
    }

    async fn expect_ok(&self, request: HostRequest) -> Result<()> {
        let command = request.command();
        match self.send(request).await? {
            HostReply::Ok => Ok(()),
            other => Err(unexpected(command, &other)),
        }
    }

    async fn expect_sources(&self, request: HostRequest) -> Result<Vec<CaptureSource>> {
        let command = request.command();
        match self.send(request).await? {
            HostReply::Sources { sources } => Ok(sources),
            other => Err(unexpected(command, &other)),
        }
    }

    async fn expect_source(&self, request: HostRequest) -> Result<CaptureSource> {
        let command = request.command();
        match self.send(request).await? {
            HostReply::Source { source } => Ok(source),
            other => Err(unexpected(command, &other)),
        }
    }
}

impl Default for IpcHost {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected(command: &str, reply: &HostReply) -> GlimpseError {
    GlimpseError::ipc(format!("Unexpected reply to {}: {:?}", command, reply))
}

#[async_trait]
impl HostBridge for IpcHost {
    async fn get_monitors(&self, params: PreviewParams) -> Result<Vec<CaptureSource>> {
        self.expect_sources(HostRequest::GetMonitors {
            fps: params.fps,
            width: params.width,
            height: params.height,
        })
        .await
    }

    async fn get_windows(&self, params: PreviewParams) -> Result<Vec<CaptureSource>> {
        self.expect_sources(HostRequest::GetWindows {
            fps: params.fps,
            width: params.width,
            height: params.height,
        })
        .await
    }

    async fn get_monitor_by_id(&self, id: &str, params: PreviewParams) -> Result<CaptureSource> {
        self.expect_source(HostRequest::GetMonitorById {
            id: id.to_string(),
            fps: params.fps,
            width: params.width,
            height: params.height,
        })
        .await
    }

    async fn get_window_by_id(&self, id: &str, params: PreviewParams) -> Result<CaptureSource> {
        self.expect_source(HostRequest::GetWindowById {
            id: id.to_string(),
            fps: params.fps,
            width: params.width,
            height: params.height,
        })
        .await
    }

    async fn start_monitor_preview(&self, hmonitor: isize, params: PreviewParams) -> Result<()> {
        self.expect_ok(HostRequest::StartMonitorPreview {
            hmonitor,
            fps: params.fps,
            width: params.width,
            height: params.height,
        })
        .await
    }

    async fn start_window_preview(&self, hwnd: isize, params: PreviewParams) -> Result<()> {
        self.expect_ok(HostRequest::StartWindowPreview {
            hwnd,
            fps: params.fps,
            width: params.width,
            height: params.height,
        })
        .await
    }

    async fn get_preview_offer(&self, id: &str) -> Result<PreviewOffer> {
        let request = HostRequest::GetPreviewOffer { id: id.to_string() };
        let command = request.command();
        match self.send(request).await? {
            HostReply::Offer { offer } => Ok(offer),
            other => Err(unexpected(command, &other)),
        }
    }

    async fn accept_preview_answer(&self, id: &str, sdp: &str) -> Result<()> {
        self.expect_ok(HostRequest::AcceptPreviewAnswer {
            id: id.to_string(),
            sdp: sdp.to_string(),
        })
        .await
    }

    async fn add_preview_ice_candidate(&self, id: &str, candidate: IceCandidate) -> Result<()> {
        self.expect_ok(HostRequest::ice_candidate(id, candidate)).await
    }

    async fn stop_preview(&self, id: &str) -> Result<()> {
        self.expect_ok(HostRequest::StopPreview { id: id.to_string() })
            .await
    }

    async fn subscribe(&self) -> Result<Subscription<HostEvent>> {
        let stream = self.connect().await?;
        let (reader, mut writer) = stream.into_split();

        writer
            .write_all(&HostRequest::Subscribe.to_bytes())
            .await
            .map_err(|e| GlimpseError::ipc(format!("Failed to subscribe: {}", e)))?;

        let mut reader = BufReader::new(reader);
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let task = tokio::spawn(async move {
            // Keep the write half alive; the host treats EOF as unsubscribe
            let _writer = writer;
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("Host closed event stream");
                        break;
                    }
                    Ok(_) => match HostReply::from_bytes(line.trim().as_bytes()) {
                        Ok(HostReply::Event { event }) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(HostReply::Error { message }) => {
                            warn!("Host rejected subscription: {}", message);
                            break;
                        }
                        Ok(other) => debug!("Ignoring non-event reply: {:?}", other),
                        Err(e) => warn!("Invalid event from host: {}", e),
                    },
                    Err(e) => {
                        warn!("Error reading host events: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(rx, task))
    }
}
