use anyhow::Context;
use clap::Parser;
use tally_cli::{AppConfig, Args, serve, spawn_event_logger};
use tally_logger::Logger;
use tally_voting::VotingRegistry;
use tokio::io::{BufReader, stdin, stdout};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())
        .context("Critical: Configuration is malformed")?
        .with_args(&args);

    let _log = Logger::init(env!("CARGO_PKG_NAME"), &config.logging)?;

    let registry = VotingRegistry::builder().config(config.voting).build()?;
    let notifications = spawn_event_logger(registry.events())?;

    let summary = serve(&registry, BufReader::new(stdin()), stdout()).await?;

    let channels = registry.events().shutdown();
    let logged = notifications.await.context("Notification logger panicked")?;

    info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        notifications = logged,
        channels_closed = channels,
        sessions = registry.session_count(),
        "Input exhausted, shutting down"
    );
    Ok(())
}
