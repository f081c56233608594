//! Notification sink configuration.
//!
//! A sink is opaque to the tracker: a webhook URL plus whatever the
//! renderer needs to address and decorate the message. The registry is the
//! one piece of configuration that can be swapped at runtime (SIGHUP), so
//! it lives behind a shared lock with a version counter.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

/// One notification destination.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub webhook_url: Url,
    /// Channel override injected into the delivery payload, for sinks that
    /// route on it.
    pub channel: Option<String>,
    /// Participant-name decorations applied to rendered text for this sink
    /// only (`"Sweden"` → `"Sweden (Anna)"`).
    pub decorations: BTreeMap<String, String>,
}

/// Shared, reloadable list of sinks.
#[derive(Clone)]
pub struct SinkRegistry {
    inner: Arc<RwLock<Vec<SinkConfig>>>,
    version: Arc<AtomicU64>,
}

impl SinkRegistry {
    pub fn new(sinks: Vec<SinkConfig>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(sinks)),
            version: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Replace the whole sink list, e.g. after a config reload.
    pub async fn replace(&self, sinks: Vec<SinkConfig>) {
        let count = sinks.len();
        *self.inner.write().await = sinks;
        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        info!(count, version, "sink registry replaced");
    }

    /// Clone the current sink list for one delivery round, so a reload
    /// mid-round cannot tear the set being delivered to.
    pub async fn snapshot(&self) -> Vec<SinkConfig> {
        self.inner.read().await.clone()
    }
}
