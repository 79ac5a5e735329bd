//! Glimpse Core Library
//!
//! Live screen and window previews from a capture host.
//!
//! This library provides:
//! - Monitor and window enumeration with thumbnails
//! - WebRTC preview negotiation against the host's signaling commands
//! - Lifecycle management for one live preview connection per source
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  IPC   ┌──────────────────┐  SDP/ICE  ┌─────────────────┐
//! │  Capture Host   │◀──────▶│  ScreenCapture   │──────────▶│  PeerEndpoint   │
//! │ (HostBridge)    │        │ registry/negot.  │           │ (webrtc crate)  │
//! └─────────────────┘        └──────────────────┘           └────────┬────────┘
//!                                                                    ▼
//!                                                           ┌─────────────────┐
//!                                                           │  PlaybackSink   │
//!                                                           └─────────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod host;
pub mod lifecycle;
pub mod negotiator;
pub mod notify;
pub mod registry;
pub mod sink;
pub mod types;

pub use capture::ScreenCapture;
pub use config::{ConfigFile, RetryPolicy};
pub use context::AppContext;
pub use error::{GlimpseError, Result};
pub use host::{HostBridge, IpcHost};
pub use types::{CaptureSource, IceCandidate, NativeHandle, PreviewOffer, PreviewParams, SourceType};
