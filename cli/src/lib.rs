//! `agenda-tracker` command line: terminal dashboard plus `serve`.

pub mod render;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracker_core::{ApiKeys, Tracker, TrackerConfig};
use tracker_server::AppState;
use tracker_server::telemetry::init_tracing;

#[derive(Debug, Parser)]
#[command(
    name = "agenda-tracker",
    version,
    about = "Track political predictions and authoritarian indicators against live news"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Config file (defaults to $TRACKER_CONFIG, then ~/.config/agenda-tracker/tracker.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of the text dashboard.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit JSON log lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List predictions grouped by timeframe.
    Predictions,
    /// Run the weekly news check and score every prediction.
    Score,
    /// Show current progress per category.
    Progress,
    /// Re-estimate progress for every category from fresh news.
    Analyze,
    /// Re-estimate progress, then evaluate alert rules against it.
    Alerts,
    /// Fetch and tag the geopolitical feed.
    Feed,
    /// Re-estimate progress, then write the weekly PDF report.
    Report {
        /// Where to write the PDF.
        #[arg(long, short = 'o', default_value = tracker_core::report::REPORT_FILENAME)]
        output: PathBuf,
    },
    /// Start the HTTP API.
    Serve {
        /// Listen address, overriding `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn emit(json: bool, value: serde_json::Value, text: String) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        write!(stdout, "{text}")?;
    }
    Ok(())
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let (config, source) = TrackerConfig::load_with_source(cli.global.config.as_deref())?;
    init_tracing(cli.global.log_json || config.log.json);
    source.log();

    let tracker = Tracker::from_config(&config, &ApiKeys::from_env())?;
    let json = cli.global.json;

    match cli.command {
        Command::Predictions => {
            let predictions = tracker.predictions().await;
            emit(
                json,
                json!({ "predictions": predictions }),
                render::predictions(&predictions),
            )
        }
        Command::Score => {
            let predictions = tracker.score_predictions().await;
            let scorecard = tracker.scorecard().await;
            let text = format!(
                "{}\n{}",
                render::predictions(&predictions),
                render::scorecard(&scorecard)
            );
            emit(
                json,
                json!({ "predictions": predictions, "scorecard": scorecard }),
                text,
            )
        }
        Command::Progress => {
            let items = tracker.progress().await;
            emit(json, json!({ "items": items }), render::progress(&items))
        }
        Command::Analyze => {
            let items = tracker.analyze_progress().await;
            emit(json, json!({ "items": items }), render::progress(&items))
        }
        Command::Alerts => {
            tracker.analyze_progress().await;
            let status = tracker.alerts().await;
            emit(json, json!(status), render::alerts(&status))
        }
        Command::Feed => {
            let articles = tracker.geopolitical_feed().await;
            emit(json, json!({ "articles": articles }), render::feed(&articles))
        }
        Command::Report { output } => {
            tracker.analyze_progress().await;
            let pdf = tracker.report_pdf().await;
            std::fs::write(&output, &pdf)
                .with_context(|| format!("failed to write {}", output.display()))?;
            tracing::info!(path = %output.display(), bytes = pdf.len(), "report written");
            emit(
                json,
                json!({ "path": output.display().to_string(), "bytes": pdf.len() }),
                format!("Report written to {}\n", output.display()),
            )
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or(config.server.bind);
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            tracing::info!(addr = %listener.local_addr()?, "listening");
            tracker_server::serve(
                listener,
                AppState::new(tracker),
                tracker_server::shutdown_signal(),
            )
            .await?;
            Ok(())
        }
    }
}
