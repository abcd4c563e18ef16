//! relaybot CLI entry point.

use relaybot::config::Config;
use relaybot::messaging::{IrcSession, Session as _};
use relaybot::relay::RelayService;

use anyhow::Context as _;
use clap::Parser;

use std::sync::Arc;

#[derive(Parser)]
#[command(name = "relaybot")]
#[command(about = "Relays addressed IRC messages to a text-generation service")]
struct Cli {
    /// Path to a TOML config file (optional, environment wins)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    relaybot::telemetry::init_tracing(cli.debug);

    tracing::info!("starting relaybot");

    let config = if let Some(config_path) = cli.config {
        Config::load_from_path(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        Config::load().context("failed to load configuration from environment")?
    };

    tracing::info!(
        server = %config.irc.address(),
        nick = %config.irc.nickname,
        channel = %config.irc.channel,
        activity_log = %config.relay.activity_log.display(),
        model = %config.llm.model,
        "configuration loaded"
    );

    let relay = RelayService::from_config(&config).context("failed to initialize relay")?;

    let (session, events) = IrcSession::connect(&config.irc)
        .await
        .with_context(|| format!("could not connect to {}", config.irc.address()))?;
    let session = Arc::new(session);

    let router = {
        let session = session.clone();
        tokio::spawn(async move { relay.run(session.as_ref(), events).await })
    };

    tokio::select! {
        result = router => {
            let result = result.context("relay task panicked")?;
            result.context("session ended")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            session.shutdown().await.context("failed to shut down session")?;
        }
    }

    tracing::info!("relaybot stopped");
    Ok(())
}
