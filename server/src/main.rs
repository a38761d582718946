//! `tracker-server` entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracker_core::{ApiKeys, Tracker, TrackerConfig};
use tracker_server::AppState;
use tracker_server::telemetry::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "tracker-server", version, about = "Agenda tracker HTTP API")]
struct Args {
    /// Config file (defaults to $TRACKER_CONFIG, then ~/.config/agenda-tracker/tracker.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding `server.bind`.
    #[arg(long)]
    bind: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();

    let (config, source) = TrackerConfig::load_with_source(args.config.as_deref())?;
    init_tracing(args.log_json || config.log.json);
    tracing::info!("tracker-server v{} starting", env!("CARGO_PKG_VERSION"));
    source.log();

    let tracker = Tracker::from_config(&config, &ApiKeys::from_env())?;
    let bind = args.bind.unwrap_or(config.server.bind);
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    tracker_server::serve(
        listener,
        AppState::new(tracker),
        tracker_server::shutdown_signal(),
    )
    .await?;
    tracing::info!("tracker-server exiting cleanly");
    Ok(())
}
