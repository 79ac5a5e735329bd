//! Application context
//!
//! Built once at startup and passed to whatever needs configuration or a
//! way to surface errors to the user.

use std::path::PathBuf;
use std::sync::Arc;

use crate::capture::ScreenCapture;
use crate::config::{ConfigFile, RetryPolicy};
use crate::endpoint::rtc::RtcEndpointFactory;
use crate::error::Result;
use crate::host::{HostBridge, IpcHost};
use crate::negotiator::PreviewNegotiator;
use crate::notify::Notifier;
use crate::types::PreviewParams;

/// Shared configuration and notification channel
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ConfigFile>,
    pub notifier: Notifier,
}

impl AppContext {
    /// Build a context around an already loaded config
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config: Arc::new(config),
            notifier: Notifier::default(),
        }
    }

    /// Load the config file at `path`, or the default location
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config = match path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };
        Ok(Self::new(config))
    }

    /// Default preview parameters from the config
    pub fn preview_params(&self) -> PreviewParams {
        self.config.preview.params()
    }

    /// Host client honoring the configured socket override
    pub fn host(&self) -> IpcHost {
        match &self.config.host.socket_path {
            Some(path) => IpcHost::with_path(path),
            None => IpcHost::new(),
        }
    }

    /// Screen capture facade over the configured host
    pub fn screen_capture(&self) -> ScreenCapture {
        self.screen_capture_with(Arc::new(self.host()))
    }

    /// Screen capture facade over any host, with configured WebRTC and retry settings
    pub fn screen_capture_with(&self, host: Arc<dyn HostBridge>) -> ScreenCapture {
        let factory = Arc::new(RtcEndpointFactory::new(self.config.webrtc.ice_servers.clone()));
        let negotiator = PreviewNegotiator::new(host.clone(), factory)
            .with_trickle_ice(self.config.webrtc.trickle_ice)
            .with_retry(RetryPolicy::from(&self.config.retry));
        ScreenCapture::from_parts(host, negotiator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_uses_socket_override() {
        let mut config = ConfigFile::default();
        config.host.socket_path = Some(PathBuf::from("/tmp/custom-host.sock"));

        let ctx = AppContext::new(config);
        assert_eq!(ctx.host().path(), &PathBuf::from("/tmp/custom-host.sock"));
    }

    #[test]
    fn test_preview_params_from_config() {
        let ctx = AppContext::new(ConfigFile::default());
        assert_eq!(ctx.preview_params(), PreviewParams::default());
    }
}
