//! Notifier processor.
//!
//! The Notifier is responsible for:
//! - receiving per-cycle event batches from the poll driver
//! - rendering them into messages (one digest, one message per match)
//! - applying each sink's participant decorations
//! - POSTing the payload template with the text injected, per sink
//!
//! Delivery is best-effort and fire-and-forget: a failing sink is logged
//! and never affects other sinks, the tracker, or the poll cadence. The
//! number of in-flight deliveries is capped by a semaphore so a slow sink
//! cannot pile up unbounded tasks.

use crate::events::channels::EventBatchReceiver;
use crate::events::render::{decorate, render_cycle};
use crate::events::types::EventBatch;
use crate::sinks::SinkRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// Errors for a single webhook delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request error
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The sink answered with a non-success status.
    #[error("sink rejected delivery with status {status}")]
    Rejected { status: u16 },
}

/// Notifier fans rendered messages out to every registered sink.
pub struct Notifier {
    batch_rx: EventBatchReceiver,
    sinks: SinkRegistry,
    payload_template: Value,
    permits: Arc<Semaphore>,
    http: reqwest::Client,
}

impl Notifier {
    /// Create a new Notifier.
    ///
    /// `concurrency` caps simultaneous in-flight deliveries across all
    /// sinks; `payload_template` is the JSON body skeleton the text and
    /// channel are injected into.
    pub fn new(
        batch_rx: EventBatchReceiver,
        sinks: SinkRegistry,
        payload_template: Value,
        concurrency: usize,
    ) -> Self {
        Self {
            batch_rx,
            sinks,
            payload_template,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Run the Notifier until the batch channel closes.
    ///
    /// Shutdown rides on channel closure rather than a separate signal:
    /// whatever the driver derived before stopping is still delivered, and
    /// the final drain below is the process's delivery barrier.
    pub async fn run(mut self) {
        info!("notifier started");

        let mut deliveries: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                maybe_batch = self.batch_rx.recv() => {
                    match maybe_batch {
                        Some(batch) => self.dispatch(batch, &mut deliveries).await,
                        None => {
                            info!("event batch channel closed");
                            break;
                        }
                    }
                }

                // Reap finished deliveries so the set stays small on long runs.
                Some(_) = deliveries.join_next(), if !deliveries.is_empty() => {}
            }
        }

        while deliveries.join_next().await.is_some() {}

        info!("notifier shutdown complete");
    }

    async fn dispatch(&self, batch: EventBatch, deliveries: &mut JoinSet<()>) {
        let messages = render_cycle(&batch.events);
        if messages.is_empty() {
            return;
        }
        let sinks = self.sinks.snapshot().await;
        debug!(
            events = batch.events.len(),
            messages = messages.len(),
            sinks = sinks.len(),
            "dispatching cycle"
        );

        for sink in &sinks {
            for message in &messages {
                let text = decorate(message, &sink.decorations);
                let payload =
                    build_payload(&self.payload_template, sink.channel.as_deref(), &text);
                let Ok(permit) = self.permits.clone().acquire_owned().await else {
                    return;
                };
                let client = self.http.clone();
                let url = sink.webhook_url.clone();
                deliveries.spawn(async move {
                    let _permit = permit;
                    if let Err(e) = deliver(&client, &url, &payload).await {
                        warn!(url = %url, error = %e, "delivery failed");
                    }
                });
            }
        }
    }
}

/// Build one sink's delivery body: the configured template with the
/// rendered text and, when set, the channel injected.
fn build_payload(template: &Value, channel: Option<&str>, text: &str) -> Value {
    let mut body = match template {
        Value::Object(map) => Value::Object(map.clone()),
        _ => Value::Object(serde_json::Map::new()),
    };
    if let Value::Object(map) = &mut body {
        map.insert("text".to_string(), Value::String(text.to_string()));
        if let Some(channel) = channel {
            map.insert("channel".to_string(), Value::String(channel.to_string()));
        }
    }
    body
}

async fn deliver(
    client: &reqwest::Client,
    url: &Url,
    payload: &Value,
) -> Result<(), DeliveryError> {
    let response = client.post(url.clone()).json(payload).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DeliveryError::Rejected {
            status: status.as_u16(),
        });
    }
    Ok(())
}
