//! alarmwatch - Plant alarm poller and notifier
//!
//! Periodically queries a plant-monitoring alarm source and forwards
//! filtered alarm events to the configured notification channels.

use alarmwatch::{app::App, cli::Cli, config::Config};
use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment,
    // and CLI args. Configuration failure is fatal.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!("alarmwatch starting up...");
    info!("Poll interval: {}s", config.poll_interval_seconds);
    match config.max_window_seconds {
        Some(max) => info!("Maximum window width: {}s", max),
        None => info!("Maximum window width: unbounded"),
    }
    info!("Alarm source: {} ({})", config.source.url, config.source.database);
    let enabled = |on: bool| if on { "Enabled" } else { "Disabled" };
    info!(
        "Email channel: {}",
        enabled(config.channels.email.as_ref().is_some_and(|c| c.filter.enabled))
    );
    info!(
        "Syslog channel: {}",
        enabled(config.channels.syslog.as_ref().is_some_and(|c| c.filter.enabled))
    );
    info!(
        "Slack channel: {}",
        enabled(config.channels.slack.as_ref().is_some_and(|c| c.filter.enabled))
    );
    info!(
        "Zulip channel: {}",
        enabled(config.channels.zulip.as_ref().is_some_and(|c| c.filter.enabled))
    );

    // =========================================================================
    // Create Shutdown Channel
    // =========================================================================
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Interrupt received. Shutting down gracefully...");
        let _ = shutdown_tx.send(true);
    });

    let app = App::builder(config).build(shutdown_rx).await?;
    app.run().await?;

    info!("alarmwatch shut down. Exiting.");
    Ok(())
}
