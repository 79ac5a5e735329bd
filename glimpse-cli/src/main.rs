//! Glimpse CLI
//!
//! Live previews of monitors and windows served by a capture host.
//!
//! # Usage
//!
//! ```bash
//! # List available sources
//! glimpse list
//!
//! # Preview a monitor until Ctrl+C
//! glimpse preview monitor_65537
//!
//! # Stop a preview left running on the host
//! glimpse stop monitor_65537
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use glimpse_core::{AppContext, ConfigFile};
use std::path::PathBuf;
use tracing::{Level, warn};
use tracing_subscriber::EnvFilter;

/// Glimpse - live capture previews
#[derive(Parser)]
#[command(name = "glimpse")]
#[command(version)]
#[command(about = "Live monitor and window previews from a capture host", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture sources
    #[command(alias = "ls")]
    List(commands::ListArgs),

    /// Preview a source until interrupted
    Preview(commands::PreviewArgs),

    /// Stop a preview on the host
    Stop(commands::StopArgs),

    /// Print host events as they arrive
    Watch,

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut filter = EnvFilter::from_default_env();
    for crate_name in ["glimpse", "glimpse_core"] {
        if let Ok(directive) = format!("{}={}", crate_name, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Run the appropriate command
    match cli.command {
        Commands::List(args) => commands::list(&load_context(cli.config), args).await?,
        Commands::Preview(args) => commands::preview(&load_context(cli.config), args).await?,
        Commands::Stop(args) => commands::stop(&load_context(cli.config), args).await?,
        Commands::Watch => commands::watch(&load_context(cli.config)).await?,
        Commands::Config(args) => commands::config(args, cli.config).await?,
    }

    Ok(())
}

/// Config problems are not fatal; fall back to defaults
fn load_context(path: Option<PathBuf>) -> AppContext {
    match AppContext::load(path) {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!("Failed to load config file: {}, using defaults", e);
            AppContext::new(ConfigFile::default())
        }
    }
}
