//! matchday
//!
//! Polls a live-football data source and pushes deduplicated match events
//! (kickoff, goals, cards, half-time, full-time) to webhook sinks.

mod config;
mod shutdown;

use clap::Parser;
use config::{ConfigLoader, Overrides};
use config::file::SourceKind;
use matchday_core::events::channels::EventBatchSender;
use matchday_core::events::event_batch_channel;
use matchday_core::processors::{Notifier, PollConfig, PollDriver};
use matchday_core::sinks::SinkRegistry;
use matchday_core::source::SnapshotSource;
use matchday_core::tracker::MatchTracker;
use matchday_sources::{FixturesSource, LivescoreSource};
use shutdown::spawn_sink_reload_handler;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Matchday - live fixture change notifier
#[derive(Parser, Debug)]
#[command(name = "matchday")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./matchday.toml")]
    config: PathBuf,

    /// Override the poll interval in seconds
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Keep polling even after every tracked match has finished
    #[arg(long, default_value = "false")]
    unbounded: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting matchday v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(
        &args.config,
        Overrides {
            interval_secs: args.interval_secs,
            unbounded: args.unbounded,
        },
    ));
    let loaded = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let registry = SinkRegistry::new(loaded.sinks.clone());
    let (batch_tx, batch_rx) = event_batch_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Notifier first, so the first schedule digest has a consumer.
    let notifier = Notifier::new(
        batch_rx,
        registry.clone(),
        loaded.payload_template.clone(),
        loaded.delivery_concurrency,
    );
    let notifier_handle = tokio::spawn(notifier.run());

    let tracker = MatchTracker::new(loaded.tracker);
    let mut driver_handle = match loaded.source.kind {
        SourceKind::Livescore => spawn_driver(
            LivescoreSource::new(loaded.source.base_url.clone()),
            tracker,
            batch_tx,
            loaded.poll,
            shutdown_rx.clone(),
        ),
        SourceKind::Fixtures => spawn_driver(
            FixturesSource::new(
                loaded.source.base_url.clone(),
                loaded.source.auth_token.clone(),
                loaded.source.hours_to_add,
            ),
            tracker,
            batch_tx,
            loaded.poll,
            shutdown_rx.clone(),
        ),
    };

    // Spawn sink reload handler (listens for SIGHUP)
    let reload_notify = spawn_sink_reload_handler(config_loader, registry);

    // Run until a signal arrives or, in bounded mode, until the driver
    // decides the day is over.
    let driver_done = tokio::select! {
        _ = shutdown::shutdown_signal() => false,
        _ = &mut driver_handle => {
            tracing::info!("Poll driver finished, shutting down");
            true
        }
    };

    let _ = shutdown_tx.send(true);
    if !driver_done {
        // Let the in-flight cycle complete; its events still get dispatched.
        let _ = driver_handle.await;
    }

    // The driver dropped its sender, so the notifier drains the remaining
    // batches and its in-flight deliveries before returning.
    let _ = notifier_handle.await;

    reload_notify.notify_one();
    tracing::info!("Shutdown complete");

    Ok(())
}

fn spawn_driver<S: SnapshotSource + 'static>(
    source: S,
    tracker: MatchTracker,
    batch_tx: EventBatchSender,
    poll: PollConfig,
    shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(PollDriver::new(source, tracker, batch_tx, poll).run(shutdown_rx))
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
