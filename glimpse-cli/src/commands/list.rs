//! List sources command

use anyhow::Result;
use clap::Args;
use glimpse_core::{AppContext, CaptureSource};

use super::ParamArgs;

/// Arguments for the list command
#[derive(Args)]
pub struct ListArgs {
    /// Only list monitors
    #[arg(long, conflicts_with = "windows")]
    pub monitors: bool,

    /// Only list windows
    #[arg(long)]
    pub windows: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub params: ParamArgs,
}

/// List available capture sources
pub async fn list(ctx: &AppContext, args: ListArgs) -> Result<()> {
    let capture = ctx.screen_capture();
    let params = args.params.resolve(ctx.preview_params());

    let mut sources: Vec<CaptureSource> = Vec::new();
    let mut failures: Vec<String> = Vec::new();

    if !args.windows {
        match capture.fetch_monitors(params).await {
            Ok(monitors) => sources.extend(monitors),
            Err(e) => failures.push(format!("monitors: {}", e)),
        }
    }
    if !args.monitors {
        match capture.fetch_windows(params).await {
            Ok(windows) => sources.extend(windows),
            Err(e) => failures.push(format!("windows: {}", e)),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
    } else {
        print_table(&sources);
    }

    for failure in &failures {
        eprintln!("Failed to list {}", failure);
    }
    if !failures.is_empty() && sources.is_empty() {
        eprintln!("\nIs the capture host running at {}?", ctx.host().path().display());
        anyhow::bail!("No sources could be listed");
    }

    Ok(())
}

fn print_table(sources: &[CaptureSource]) {
    println!("Glimpse - Available Capture Sources\n");

    if sources.is_empty() {
        println!("No sources found.");
        return;
    }

    println!(
        "{:<24} {:<36} {:<10} {:<12}",
        "ID", "Title", "Type", "Resolution"
    );
    println!("{}", "-".repeat(84));

    for source in sources {
        let dims = if source.width > 0 && source.height > 0 {
            format!("{}x{}", source.width, source.height)
        } else {
            "Unknown".to_string()
        };

        println!(
            "{:<24} {:<36} {:<10} {}",
            source.id,
            truncate(&source.title, 34),
            source.source_type.to_string(),
            dims
        );
    }

    println!("\nStart a preview with 'glimpse preview <ID>'.");
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
