//! Host wire protocol
//!
//! Newline-delimited JSON. Command names match the host's command table.

use serde::{Deserialize, Serialize};

use crate::error::GlimpseError;
use crate::events::HostEvent;
use crate::types::{CaptureSource, IceCandidate, PreviewOffer, PreviewParams};

/// Requests sent to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostRequest {
    GetMonitors {
        fps: i32,
        width: i32,
        height: i32,
    },
    GetWindows {
        fps: i32,
        width: i32,
        height: i32,
    },
    GetMonitorById {
        id: String,
        fps: i32,
        width: i32,
        height: i32,
    },
    GetWindowById {
        id: String,
        fps: i32,
        width: i32,
        height: i32,
    },
    StartMonitorPreview {
        hmonitor: isize,
        fps: i32,
        width: i32,
        height: i32,
    },
    StartWindowPreview {
        hwnd: isize,
        fps: i32,
        width: i32,
        height: i32,
    },
    GetPreviewOffer {
        id: String,
    },
    AcceptPreviewAnswer {
        id: String,
        sdp: String,
    },
    AddPreviewIceCandidate {
        id: String,
        candidate: String,
        #[serde(rename = "sdpMid")]
        sdp_mid: Option<String>,
        #[serde(rename = "sdpMLineIndex")]
        sdp_mline_index: Option<u16>,
    },
    StopPreview {
        id: String,
    },
    /// Turn this connection into an event stream
    Subscribe,
}

/// Replies from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostReply {
    /// Command accepted, nothing to return
    Ok,
    /// Enumeration result
    Sources { sources: Vec<CaptureSource> },
    /// Single source snapshot
    Source { source: CaptureSource },
    /// Preview offer
    Offer { offer: PreviewOffer },
    /// Command rejected
    Error { message: String },
    /// Pushed event on a subscribed connection
    Event { event: HostEvent },
}

impl HostRequest {
    /// Command name as the host knows it
    pub fn command(&self) -> &'static str {
        match self {
            Self::GetMonitors { .. } => "get_monitors",
            Self::GetWindows { .. } => "get_windows",
            Self::GetMonitorById { .. } => "get_monitor_by_id",
            Self::GetWindowById { .. } => "get_window_by_id",
            Self::StartMonitorPreview { .. } => "start_monitor_preview",
            Self::StartWindowPreview { .. } => "start_window_preview",
            Self::GetPreviewOffer { .. } => "get_preview_offer",
            Self::AcceptPreviewAnswer { .. } => "accept_preview_answer",
            Self::AddPreviewIceCandidate { .. } => "add_preview_ice_candidate",
            Self::StopPreview { .. } => "stop_preview",
            Self::Subscribe => "subscribe",
        }
    }

    /// Params carried by enumeration and start commands
    pub fn params(&self) -> Option<PreviewParams> {
        match *self {
            Self::GetMonitors { fps, width, height }
            | Self::GetWindows { fps, width, height }
            | Self::GetMonitorById { fps, width, height, .. }
            | Self::GetWindowById { fps, width, height, .. }
            | Self::StartMonitorPreview { fps, width, height, .. }
            | Self::StartWindowPreview { fps, width, height, .. } => {
                Some(PreviewParams::new(fps, width, height))
            }
            _ => None,
        }
    }

    pub(crate) fn ice_candidate(id: &str, candidate: IceCandidate) -> Self {
        Self::AddPreviewIceCandidate {
            id: id.to_string(),
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
        }
    }

    /// Serialize request to JSON bytes with newline terminator
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = serde_json::to_vec(self).unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    /// Deserialize request from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl HostReply {
    /// Serialize reply to JSON bytes with newline terminator
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = serde_json::to_vec(self).unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    /// Deserialize reply from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Create an error reply
    pub fn error(message: impl Into<String>) -> Self {
        HostReply::Error {
            message: message.into(),
        }
    }

    /// Error reply carrying the host's own message, without local prefixes
    pub fn from_error(err: &GlimpseError) -> Self {
        match err.root() {
            GlimpseError::Host(message) => Self::error(message.clone()),
            _ => Self::error(err.to_string()),
        }
    }
}
