//! Watch command - print host events

use anyhow::{Context, Result};
use glimpse_core::events::HostEvent;
use glimpse_core::{AppContext, HostBridge};
use tokio::signal;
use tracing::warn;

/// Print host events until Ctrl+C or until the host goes away
pub async fn watch(ctx: &AppContext) -> Result<()> {
    let host = ctx.host();
    let mut subscription = host
        .subscribe()
        .await
        .with_context(|| format!("Failed to subscribe at {}", host.path().display()))?;

    println!("Watching host events. Press Ctrl+C to stop...\n");

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = subscription.recv() => match event {
                Some(HostEvent::SourcesUpdate { sources, fps }) => {
                    println!("share-screen-list: {} source(s) at {} fps", sources.len(), fps);
                    for source in sources {
                        println!("  {:<24} {}", source.id, source.title);
                    }
                }
                Some(HostEvent::StreamFps(fps)) => println!("debug-stream-fps: {}", fps),
                None => {
                    println!("Host closed the event stream.");
                    break;
                }
            },
        }
    }

    subscription.unsubscribe();
    Ok(())
}
