use clap::Parser;
use tracker_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracker_cli::run(Cli::parse()).await
}
