//! Signal handling for graceful shutdown and sink reload.

use crate::config::ConfigLoader;
use matchday_core::sinks::SinkRegistry;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Spawns a task that listens for SIGHUP and reloads the sink list.
///
/// Only sinks are swapped at runtime; source and cadence changes need a
/// restart, since the tracker's records are keyed to the running source.
/// Returns a Notify used to stop the task at shutdown.
pub fn spawn_sink_reload_handler(
    config_loader: Arc<ConfigLoader>,
    sinks: SinkRegistry,
) -> Arc<Notify> {
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    tokio::spawn(async move {
        let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading sink configuration");
                    match config_loader.reload() {
                        Ok(loaded) => {
                            sinks.replace(loaded.sinks).await;
                            tracing::info!("Sink configuration reloaded successfully");
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
                _ = shutdown_notify_clone.notified() => {
                    tracing::debug!("Sink reload handler shutting down");
                    break;
                }
            }
        }
    });

    shutdown_notify
}
