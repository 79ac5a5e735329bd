//! Error types for Glimpse

use thiserror::Error;

/// Result type alias using GlimpseError
pub type Result<T> = std::result::Result<T, GlimpseError>;

/// Main error type for Glimpse operations
#[derive(Debug, Error)]
pub enum GlimpseError {
    /// The host process rejected a command
    #[error("Host error: {0}")]
    Host(String),

    /// Transport to the host failed (socket, framing, timeouts)
    #[error("IPC error: {0}")]
    Ipc(String),

    /// Offer/answer exchange failed
    #[error("Negotiation error: {0}")]
    Negotiation(String),

    /// Local WebRTC stack error
    #[error("WebRTC error: {0}")]
    WebRtc(String),

    /// Source id does not encode a monitor or window handle
    #[error("Invalid source id: {0}")]
    InvalidSourceId(String),

    /// Source not found
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<GlimpseError>,
    },
}

impl GlimpseError {
    /// Create a host error
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Create an IPC error
    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::Ipc(msg.into())
    }

    /// Create a negotiation error
    pub fn negotiation(msg: impl Into<String>) -> Self {
        Self::Negotiation(msg.into())
    }

    /// Create a WebRTC error
    pub fn webrtc(msg: impl Into<String>) -> Self {
        Self::WebRtc(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context layers
    pub fn root(&self) -> &GlimpseError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short hint shown next to the error in user-facing surfaces
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::Host(_) => Some("The capture host rejected the request; retry the action"),
            Self::Ipc(_) => {
                Some("Make sure the capture host is running and its socket is reachable")
            }
            Self::Negotiation(_) | Self::WebRtc(_) => {
                Some("Stop the preview and start it again to renegotiate")
            }
            Self::InvalidSourceId(_) | Self::SourceNotFound(_) => {
                Some("Refresh the source list with `glimpse list`")
            }
            Self::Config(_) => Some("Check ~/.config/glimpse/config.toml"),
            _ => None,
        }
    }

    /// Whether retrying the initiating action may succeed
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(self.root(), Self::Json(_))
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<webrtc::Error> for GlimpseError {
    fn from(err: webrtc::Error) -> Self {
        Self::WebRtc(err.to_string())
    }
}

impl From<toml::de::Error> for GlimpseError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}
