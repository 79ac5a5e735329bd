//! Local media endpoints
//!
//! The receiving half of a preview connection. The negotiator drives an
//! endpoint through offer/answer; the endpoint reports what happens on the
//! wire as [`EndpointEvent`]s.

pub mod rtc;

pub use rtc::RtcEndpointFactory;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::track::track_remote::TrackRemote;

use crate::error::Result;
use crate::types::IceCandidate;

/// Connection state of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Media kind of a received track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Unknown,
}

/// A live remote stream, ready to be bound to a playback sink
#[derive(Clone)]
pub struct MediaStream {
    /// Stream id from the offer's msid
    pub id: String,
    /// Track id
    pub track_id: String,
    /// Track media kind
    pub kind: TrackKind,
    remote: Option<Arc<TrackRemote>>,
}

impl MediaStream {
    /// Stream backed by a received WebRTC track
    pub fn from_remote(track: Arc<TrackRemote>, kind: TrackKind) -> Self {
        Self {
            id: track.stream_id(),
            track_id: track.id(),
            kind,
            remote: Some(track),
        }
    }

    /// Stream with no wire track behind it (loopback hosts, tests)
    pub fn detached(id: impl Into<String>, track_id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            track_id: track_id.into(),
            kind,
            remote: None,
        }
    }

    /// Underlying WebRTC track for sinks that read RTP
    pub fn remote_track(&self) -> Option<&Arc<TrackRemote>> {
        self.remote.as_ref()
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("track_id", &self.track_id)
            .field("kind", &self.kind)
            .field("remote", &self.remote.is_some())
            .finish()
    }
}

/// Something happened on an endpoint
#[derive(Debug, Clone)]
pub enum EndpointEvent {
    /// A remote track arrived, with the streams it belongs to
    Track {
        track_id: String,
        streams: Vec<MediaStream>,
    },
    /// The connection changed state
    StateChange(ConnectionState),
    /// A local ICE candidate was gathered
    Candidate(IceCandidate),
}

/// Sender half endpoints report events on
pub type EventSender = mpsc::UnboundedSender<EndpointEvent>;

/// A local endpoint answering the host's offer
#[async_trait]
pub trait PeerEndpoint: Send + Sync {
    /// Apply the host's offer as remote description
    async fn set_remote_offer(&self, sdp: &str) -> Result<()>;

    /// Generate an answer for the applied offer
    async fn create_answer(&self) -> Result<String>;

    /// Apply the generated answer as local description
    async fn set_local_answer(&self, sdp: &str) -> Result<()>;

    /// Close the connection and release its resources
    async fn close(&self) -> Result<()>;

    /// Current connection state
    fn state(&self) -> ConnectionState;
}

/// Creates endpoints for new preview connections
#[async_trait]
pub trait EndpointFactory: Send + Sync {
    /// Create an endpoint for `source_id`, reporting on `events`
    async fn create(&self, source_id: &str, events: EventSender) -> Result<Arc<dyn PeerEndpoint>>;
}
