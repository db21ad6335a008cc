use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wxrack_core::{App, Config};
use wxrack_weather::{RunOutcome, SnapshotSource};

/// Periodic per-site weather fetcher
#[derive(Debug, Parser)]
#[command(name = "wxrack", version, about)]
struct Args {
    /// Path to the TOML config (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single fetch cycle, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    wxrack_core::init();

    let (config, _) = Config::load_validated(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;

    let mut app = App::new(config).context("Failed to initialize application")?;

    if args.once {
        match app.run_once().await {
            RunOutcome::Completed { succeeded, failed, persisted } => {
                tracing::info!(succeeded, failed, persisted, "Fetch cycle finished");
            }
            RunOutcome::Skipped => tracing::warn!("Fetch cycle skipped"),
        }
        let snapshot = app.snapshot_source().current_snapshot();
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?
        );
        return Ok(());
    }

    app.start();
    tracing::info!("wxrack started, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    app.shutdown().await;
    Ok(())
}
