//! Configuration types for Glimpse
//!
//! Runtime settings derived from the config file: preview defaults, host
//! socket location, WebRTC options and the negotiation retry policy.

mod file;

pub use file::{
    sample_config, ConfigFile, HostSettings, PreviewSettings, RetrySettings, WebRtcSettings,
};

use std::time::Duration;

/// Retry policy for preview negotiation
///
/// The default is a single attempt: failures surface to the caller, who
/// decides whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Create a policy with exponential backoff
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay to wait before `attempt` (1-based); zero for the first attempt
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(16);
        self.backoff.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, Duration::from_millis(settings.backoff_ms))
    }
}
