//! Configuration file loading
//!
//! Loads user configuration from `~/.config/glimpse/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{GlimpseError, Result};
use crate::types::PreviewParams;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Default preview cadence and size
    #[serde(default)]
    pub preview: PreviewSettings,

    /// Capture host connection
    #[serde(default)]
    pub host: HostSettings,

    /// Local WebRTC endpoint settings
    #[serde(default)]
    pub webrtc: WebRtcSettings,

    /// Negotiation retry settings
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Default preview settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Thumbnail/preview frame rate
    #[serde(default = "default_fps")]
    pub fps: i32,

    /// Preview width in pixels
    #[serde(default = "default_width")]
    pub width: i32,

    /// Preview height in pixels
    #[serde(default = "default_height")]
    pub height: i32,
}

/// Capture host settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostSettings {
    /// Override for the host socket path
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

/// WebRTC endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebRtcSettings {
    /// STUN/TURN urls; empty for a host on the same machine
    #[serde(default)]
    pub ice_servers: Vec<String>,

    /// Forward locally gathered candidates to the host as they appear
    #[serde(default = "default_true")]
    pub trickle_ice: bool,
}

/// Negotiation retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per negotiation (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_fps() -> i32 {
    10
}

fn default_width() -> i32 {
    320
}

fn default_height() -> i32 {
    180
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl PreviewSettings {
    /// Convert into request parameters
    pub fn params(&self) -> PreviewParams {
        PreviewParams::new(self.fps, self.width, self.height)
    }
}

impl Default for WebRtcSettings {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            trickle_ice: true,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("glimpse").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("glimpse")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/glimpse/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| GlimpseError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)?;
        config.validate()?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GlimpseError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GlimpseError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| GlimpseError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Reject values the host would refuse anyway
    pub fn validate(&self) -> Result<()> {
        let p = &self.preview;
        if p.fps <= 0 || p.width <= 0 || p.height <= 0 {
            return Err(GlimpseError::config(format!(
                "preview fps/width/height must be positive (got {}/{}/{})",
                p.fps, p.width, p.height
            )));
        }
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Glimpse Configuration

[preview]
# Frame rate for thumbnails and preview streams
fps = 10

# Preview size in pixels
width = 320
height = 180

[host]
# Capture host socket (defaults to $XDG_RUNTIME_DIR/glimpse-host.sock)
# socket_path = "/run/user/1000/glimpse-host.sock"

[webrtc]
# STUN/TURN servers; leave empty when the host runs on this machine
ice_servers = []

# Send ICE candidates to the host as they are gathered
trickle_ice = true

[retry]
# Attempts per preview negotiation (1 = never retry)
max_attempts = 1

# Backoff before the second attempt, doubled for each further attempt
backoff_ms = 500
"#
    .to_string()
}
