//! Core types for Glimpse
//!
//! These mirror the data the capture host exchanges with preview clients:
//! source snapshots, preview offers and trickled ICE candidates.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{GlimpseError, Result};

/// Kind of capture source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Full monitor/display capture
    Monitor,
    /// Individual window capture
    Window,
}

impl SourceType {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Monitor => "monitor_",
            Self::Window => "window_",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Monitor => write!(f, "Monitor"),
            SourceType::Window => write!(f, "Window"),
        }
    }
}

/// Native handle encoded in a source id
///
/// Ids look like `monitor_<hmonitor>` or `window_<hwnd>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeHandle {
    /// Monitor handle
    Monitor(isize),
    /// Window handle
    Window(isize),
}

impl NativeHandle {
    /// Parse a host-assigned source id
    pub fn parse(id: &str) -> Result<Self> {
        if let Some(raw) = id.strip_prefix(SourceType::Monitor.prefix()) {
            raw.parse()
                .map(Self::Monitor)
                .map_err(|_| GlimpseError::InvalidSourceId(id.to_string()))
        } else if let Some(raw) = id.strip_prefix(SourceType::Window.prefix()) {
            raw.parse()
                .map(Self::Window)
                .map_err(|_| GlimpseError::InvalidSourceId(id.to_string()))
        } else {
            Err(GlimpseError::InvalidSourceId(id.to_string()))
        }
    }

    /// Render back into the id form used by the host
    pub fn to_id(&self) -> String {
        format!("{}{}", self.source_type().prefix(), self.raw())
    }

    /// The kind of source this handle refers to
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Monitor(_) => SourceType::Monitor,
            Self::Window(_) => SourceType::Window,
        }
    }

    /// Raw platform handle value
    pub fn raw(&self) -> isize {
        match self {
            Self::Monitor(h) | Self::Window(h) => *h,
        }
    }
}

impl std::fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_id())
    }
}

/// Snapshot of a capturable monitor or window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSource {
    /// Host-assigned unique id
    pub id: String,
    /// Monitor name or window title
    pub title: String,
    /// Base64 encoded preview image
    pub thumbnail: String,
    /// Base64 encoded application icon (windows only)
    pub icon: Option<String>,
    /// What kind of source this is
    pub source_type: SourceType,
    /// Native width in pixels
    pub width: i32,
    /// Native height in pixels
    pub height: i32,
}

impl CaptureSource {
    /// Parse the native handle out of the id
    pub fn handle(&self) -> Result<NativeHandle> {
        NativeHandle::parse(&self.id)
    }

    /// Decode the thumbnail image bytes
    pub fn thumbnail_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.thumbnail)
            .map_err(|e| GlimpseError::host(format!("Invalid thumbnail for {}: {}", self.id, e)))
    }

    /// Decode the icon image bytes, if the host sent one
    pub fn icon_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.icon
            .as_deref()
            .map(|icon| {
                STANDARD
                    .decode(icon)
                    .map_err(|e| GlimpseError::host(format!("Invalid icon for {}: {}", self.id, e)))
            })
            .transpose()
    }
}

/// Session offer produced by the host for one preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewOffer {
    /// Source id the offer belongs to
    pub id: String,
    /// SDP text
    pub sdp: String,
}

/// Cadence and size for thumbnails and preview streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewParams {
    /// Frames per second
    pub fps: i32,
    /// Target width in pixels
    pub width: i32,
    /// Target height in pixels
    pub height: i32,
}

impl PreviewParams {
    /// Create preview parameters
    pub fn new(fps: i32, width: i32, height: i32) -> Self {
        Self { fps, width, height }
    }
}

impl Default for PreviewParams {
    fn default() -> Self {
        Self {
            fps: 10,
            width: 320,
            height: 180,
        }
    }
}

/// A locally gathered ICE candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Candidate line
    pub candidate: String,
    /// Media stream identification tag
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    /// Index of the m-line the candidate belongs to
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_monitor_id() {
        let handle = NativeHandle::parse("monitor_65537").unwrap();
        assert_eq!(handle, NativeHandle::Monitor(65537));
        assert_eq!(handle.source_type(), SourceType::Monitor);
        assert_eq!(handle.to_id(), "monitor_65537");
    }

    #[test]
    fn test_parse_window_id_negative() {
        let handle = NativeHandle::parse("window_-42").unwrap();
        assert_eq!(handle, NativeHandle::Window(-42));
    }

    #[test]
    fn test_parse_invalid_ids() {
        for id in ["", "monitor_", "window_abc", "screen_1", "1234"] {
            assert!(matches!(
                NativeHandle::parse(id),
                Err(GlimpseError::InvalidSourceId(_))
            ));
        }
    }

    #[test]
    fn test_default_params() {
        let params = PreviewParams::default();
        assert_eq!(params, PreviewParams::new(10, 320, 180));
    }

    #[test]
    fn test_source_json_shape() {
        let json = concat!(
            r#"{"id":"window_7","title":"Editor","thumbnail":"aGk=","icon":null,"#,
            r#""source_type":"window","width":800,"height":600}"#,
        );
        let source: CaptureSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.source_type, SourceType::Window);
        assert_eq!(source.thumbnail_bytes().unwrap(), b"hi");
        assert_eq!(source.icon_bytes().unwrap(), None);
        assert_eq!(source.handle().unwrap(), NativeHandle::Window(7));
    }

    #[test]
    fn test_candidate_wire_names() {
        let candidate = IceCandidate {
            candidate: "candidate:1 1 udp 1 127.0.0.1 5000 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
        };
        let json = serde_json::to_string(&candidate).unwrap();
        assert!(json.contains("\"sdpMid\":\"0\""));
        assert!(json.contains("\"sdpMLineIndex\":0"));
    }
}
