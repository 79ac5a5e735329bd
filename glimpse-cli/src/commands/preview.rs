//! Preview command - negotiate a live preview and report its frame rate

use anyhow::{Context, Result};
use clap::Args;
use glimpse_core::endpoint::MediaStream;
use glimpse_core::events::FpsMonitor;
use glimpse_core::notify::Notifier;
use glimpse_core::sink::PlaybackSink;
use glimpse_core::{AppContext, GlimpseError, HostBridge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info, warn};

use super::ParamArgs;

/// Arguments for the preview command
#[derive(Args)]
pub struct PreviewArgs {
    /// Source id, e.g. monitor_65537 or window_1234
    pub id: String,

    #[command(flatten)]
    pub params: ParamArgs,
}

/// Start a preview and keep it running until Ctrl+C
pub async fn preview(ctx: &AppContext, args: PreviewArgs) -> Result<()> {
    let params = args.params.resolve(ctx.preview_params());
    let capture = ctx.screen_capture();

    println!("Glimpse - Preview {}\n", args.id);
    println!("  Frame rate: {} fps", params.fps);
    println!("  Size:       {}x{}", params.width, params.height);
    println!();

    let mut notifications = ctx.notifier.subscribe();
    let host_fps = match capture.host().subscribe().await {
        Ok(subscription) => Some(FpsMonitor::spawn(subscription)),
        Err(e) => {
            debug!("Host events unavailable: {}", e);
            None
        }
    };

    let sink = Arc::new(FrameCounter::new(ctx.notifier.clone()));
    capture
        .preview(&args.id, params, sink.clone())
        .await
        .with_context(|| format!("Failed to start preview {}", args.id))?;

    println!("Preview negotiated. Press Ctrl+C to stop...\n");

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(ctrl_c);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut last_frames = 0;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("\nReceived interrupt signal...");
                break;
            }
            _ = ticker.tick() => {
                let frames = sink.frames();
                let host = host_fps.as_ref().map(|m| m.fps().to_string());
                println!(
                    "  received {:>3} fps  (host {} fps)",
                    frames - last_frames,
                    host.as_deref().unwrap_or("?")
                );
                last_frames = frames;
            }
            Ok(notification) = notifications.recv() => {
                eprintln!("{}: {}", notification.title, notification.description);
            }
        }
    }

    println!("Stopping preview...");
    if let Err(e) = capture.stop_preview(&args.id).await {
        eprintln!("Host did not confirm stop: {}", e);
    }
    capture.teardown().await;

    println!("Preview stopped.");
    Ok(())
}

/// Sink that reads RTP off the bound track and counts completed frames
struct FrameCounter {
    notifier: Notifier,
    stream: parking_lot::Mutex<Option<MediaStream>>,
    frames: Arc<AtomicU64>,
}

impl FrameCounter {
    fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            stream: parking_lot::Mutex::new(None),
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl PlaybackSink for FrameCounter {
    fn attach(&self, stream: MediaStream) {
        info!("Attached stream {} ({:?})", stream.id, stream.kind);
        *self.stream.lock() = Some(stream);
    }

    fn play(&self) -> glimpse_core::Result<()> {
        let stream = self
            .stream
            .lock()
            .clone()
            .ok_or_else(|| GlimpseError::webrtc("No stream attached"))?;
        let track = stream
            .remote_track()
            .cloned()
            .ok_or_else(|| GlimpseError::webrtc("Stream has no remote track"))?;
        let frames = self.frames.clone();

        self.notifier.spawn_guarded("Preview playback", async move {
            loop {
                match track.read_rtp().await {
                    Ok((packet, _)) => {
                        // Marker bit closes a video frame
                        if packet.header.marker {
                            frames.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(e) => {
                        debug!("Track {} ended: {}", stream.track_id, e);
                        return Ok(());
                    }
                }
            }
        });
        Ok(())
    }
}
