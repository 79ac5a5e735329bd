//! CLI command implementations

mod config;
mod list;
mod preview;
mod stop;
mod watch;

pub use config::{config, ConfigArgs};
pub use list::{list, ListArgs};
pub use preview::{preview, PreviewArgs};
pub use stop::{stop, StopArgs};
pub use watch::watch;

use clap::Args;
use glimpse_core::PreviewParams;

/// Overrides for the configured preview parameters
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Frames per second
    #[arg(long)]
    pub fps: Option<i32>,

    /// Width in pixels
    #[arg(long)]
    pub width: Option<i32>,

    /// Height in pixels
    #[arg(long)]
    pub height: Option<i32>,
}

impl ParamArgs {
    /// Apply the overrides on top of `base`
    pub fn resolve(&self, base: PreviewParams) -> PreviewParams {
        PreviewParams::new(
            self.fps.unwrap_or(base.fps),
            self.width.unwrap_or(base.width),
            self.height.unwrap_or(base.height),
        )
    }
}
