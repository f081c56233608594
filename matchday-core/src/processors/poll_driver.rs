//! PollDriver processor.
//!
//! The PollDriver is the only long-lived control loop:
//! - announces the day's schedule once, before live diffing begins
//! - fetches a snapshot batch per cycle and feeds it to the tracker
//! - forwards derived events to the notifier channel
//! - sleeps a jittered interval between cycles, interruptibly
//! - in bounded mode, stops once every tracked match has finished
//!
//! A failed fetch skips the cycle: it is logged, mutates nothing, and the
//! loop carries on.

use crate::events::channels::EventBatchSender;
use crate::events::types::{EventBatch, MatchEvent};
use crate::source::{SnapshotSource, SourceError};
use crate::tracker::MatchTracker;
use crate::utils::poll_interval::next_poll_delay;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Whether the driver bounds its own lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeMode {
    /// Stop once every tracked match is finished. For single-day fixture
    /// lists with a known finite match set.
    Bounded,
    /// Poll forever; new fixtures may appear across days.
    Unbounded,
}

/// Cadence and lifetime settings for the driver.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    /// Upper bound of the uniform random addition to each interval.
    pub jitter: Duration,
    /// Pause between the schedule announcement and the first live cycle.
    pub startup_grace: Duration,
    pub lifetime: LifetimeMode,
}

/// PollDriver owns the source and the tracker and serializes all updates.
pub struct PollDriver<S> {
    source: S,
    tracker: MatchTracker,
    batch_tx: EventBatchSender,
    config: PollConfig,
}

impl<S: SnapshotSource> PollDriver<S> {
    pub fn new(
        source: S,
        tracker: MatchTracker,
        batch_tx: EventBatchSender,
        config: PollConfig,
    ) -> Self {
        Self {
            source,
            tracker,
            batch_tx,
            config,
        }
    }

    /// Run the driver until shutdown or, in bounded mode, until every
    /// tracked match has finished.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(source = self.source.name(), "poll driver started");

        // The day digest comes first, independent of the live diff loop.
        match self.source.fetch_today().await {
            Ok(snapshots) => {
                let events = self.tracker.announce_schedule(&snapshots);
                info!(fixtures = self.tracker.tracked(), "announced today's schedule");
                self.forward(events).await;
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    "schedule fetch failed, continuing without the day digest"
                );
            }
        }

        if !self.config.startup_grace.is_zero() {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("poll driver received shutdown signal");
                        return;
                    }
                }

                _ = tokio::time::sleep(self.config.startup_grace) => {}
            }
        }

        loop {
            if let Err(e) = self.run_once().await {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    "fetch failed, skipping cycle"
                );
            }

            if self.config.lifetime == LifetimeMode::Bounded && self.tracker.all_finished() {
                info!(
                    tracked = self.tracker.tracked(),
                    "all of today's matches finished, stopping"
                );
                break;
            }

            let delay = {
                let mut rng = rand::rng();
                next_poll_delay(self.config.interval, self.config.jitter, &mut rng)
            };
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("poll driver received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("poll driver shutdown complete");
    }

    /// One poll cycle: fetch, diff, forward.
    pub async fn run_once(&mut self) -> Result<(), SourceError> {
        let snapshots = self.source.fetch_today().await?;
        let events = self.tracker.update_at(&snapshots, OffsetDateTime::now_utc());
        self.forward(events).await;
        Ok(())
    }

    async fn forward(&self, events: Vec<MatchEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.batch_tx.send(EventBatch::new(events)).await {
            error!(error = %e, "event batch receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::channels::event_batch_channel;
    use crate::fixture::{LifecycleSignal, MatchId, MatchSnapshot};
    use crate::tracker::TrackerConfig;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Vec<MatchSnapshot>, SourceError>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<MatchSnapshot>, SourceError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn fetch_today(&self) -> Result<Vec<MatchSnapshot>, SourceError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn snap(lifecycle: LifecycleSignal) -> MatchSnapshot {
        MatchSnapshot {
            match_id: MatchId::derive("SWE", "ENG"),
            home_side: "Sweden".into(),
            away_side: "England".into(),
            home_goals: 0,
            away_goals: 0,
            lifecycle,
            markers: Vec::new(),
            red_card_flags: None,
            kickoff: None,
            venue: None,
        }
    }

    fn driver(
        responses: Vec<Result<Vec<MatchSnapshot>, SourceError>>,
    ) -> (PollDriver<ScriptedSource>, crate::events::channels::EventBatchReceiver) {
        let (tx, rx) = event_batch_channel();
        let tracker = MatchTracker::new(TrackerConfig {
            completion_ceiling: Duration::from_secs(7200),
        });
        let config = PollConfig {
            interval: Duration::ZERO,
            jitter: Duration::ZERO,
            startup_grace: Duration::ZERO,
            lifetime: LifetimeMode::Bounded,
        };
        (
            PollDriver::new(ScriptedSource::new(responses), tracker, tx, config),
            rx,
        )
    }

    async fn next_batch(rx: &mut crate::events::channels::EventBatchReceiver) -> EventBatch {
        match rx.recv().await {
            Some(batch) => batch,
            None => unreachable!("driver closed the channel before sending"),
        }
    }

    #[tokio::test]
    async fn bounded_run_announces_then_stops_when_all_matches_finish() {
        let (driver, mut rx) = driver(vec![
            Ok(vec![snap(LifecycleSignal::NotStarted)]),
            Ok(vec![snap(LifecycleSignal::Ended)]),
        ]);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(driver.run(shutdown_rx));

        let first = next_batch(&mut rx).await;
        assert!(matches!(first.events[0], MatchEvent::Scheduled { .. }));

        let second = next_batch(&mut rx).await;
        assert!(matches!(second.events[0], MatchEvent::Ended { .. }));

        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn failed_fetch_skips_the_cycle_without_killing_the_loop() {
        let (driver, mut rx) = driver(vec![
            Err(SourceError::Malformed("listing page changed".into())),
            Err(SourceError::Status(503)),
            Ok(vec![snap(LifecycleSignal::Ended)]),
        ]);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(driver.run(shutdown_rx));

        // Both failures are swallowed; the first batch to arrive is the
        // successful cycle's.
        let batch = next_batch(&mut rx).await;
        assert!(matches!(batch.events[0], MatchEvent::Ended { .. }));

        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn shutdown_interrupts_the_interval_sleep() {
        let (tx, _rx) = event_batch_channel();
        let tracker = MatchTracker::new(TrackerConfig {
            completion_ceiling: Duration::from_secs(7200),
        });
        let config = PollConfig {
            interval: Duration::from_secs(3600),
            jitter: Duration::ZERO,
            startup_grace: Duration::ZERO,
            lifetime: LifetimeMode::Unbounded,
        };
        let driver = PollDriver::new(ScriptedSource::new(Vec::new()), tracker, tx, config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(driver.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(true);

        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(joined.is_ok());
    }
}
