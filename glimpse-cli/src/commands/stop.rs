//! Stop command - stop a preview on the host

use anyhow::{Context, Result};
use clap::Args;
use glimpse_core::AppContext;

/// Arguments for the stop command
#[derive(Args)]
pub struct StopArgs {
    /// Source id, e.g. monitor_65537 or window_1234
    pub id: String,
}

/// Ask the host to stop streaming a source
///
/// Useful when a previous preview exited without cleaning up; this process
/// holds no connection of its own for the id.
pub async fn stop(ctx: &AppContext, args: StopArgs) -> Result<()> {
    let capture = ctx.screen_capture();

    capture
        .stop_preview(&args.id)
        .await
        .with_context(|| format!("Failed to stop preview {}", args.id))?;

    println!("Stopped preview {}", args.id);
    Ok(())
}
