//! TOML file configuration structures.
//!
//! These structs directly map to the `matchday.toml` file format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub source: SourceSection,
    #[serde(default)]
    pub poll: PollSection,
    #[serde(default)]
    pub delivery: DeliverySection,
    #[serde(default)]
    pub sinks: Vec<SinkSection>,
}

/// Which adapter to poll with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Livescore,
    Fixtures,
}

impl SourceKind {
    /// Fallback completion ceiling per source kind. The fixtures API has
    /// been seen lagging its FINISHED status well past full time; the
    /// livescore feed gets the tighter two-hour bound.
    pub fn default_completion_ceiling_secs(self) -> u64 {
        match self {
            SourceKind::Fixtures => 9000,
            SourceKind::Livescore => 7200,
        }
    }
}

/// Snapshot source configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    pub kind: SourceKind,
    /// Full endpoint URL: the "today" endpoint for livescore sources, the
    /// competition fixtures endpoint for fixtures sources.
    pub base_url: Url,
    /// Sent as `X-Auth-Token`; only some fixtures APIs require one.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Display offset in hours for kickoff times (fixtures sources report
    /// UTC).
    #[serde(default)]
    pub hours_to_add: i64,
    /// Seconds an in-progress match may run before it is force-finished.
    /// Defaults per source kind when unset.
    #[serde(default)]
    pub completion_ceiling_secs: Option<u64>,
}

/// Poll cadence section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSection {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound of the uniform random addition to each interval.
    #[serde(default)]
    pub jitter_secs: u64,
    /// Pause between the schedule digest and the first live cycle.
    #[serde(default = "default_grace_secs")]
    pub startup_grace_secs: u64,
    /// Stop once every tracked match has finished.
    #[serde(default = "default_true")]
    pub bounded: bool,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            jitter_secs: 0,
            startup_grace_secs: default_grace_secs(),
            bounded: true,
        }
    }
}

fn default_interval_secs() -> u64 {
    90
}

fn default_grace_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// Delivery fan-out section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySection {
    /// Cap on simultaneous in-flight webhook POSTs across all sinks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Body skeleton sent to every sink; the rendered text and the sink's
    /// channel are injected per delivery.
    #[serde(default)]
    pub payload_template: Option<toml::Table>,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            payload_template: None,
        }
    }
}

fn default_concurrency() -> usize {
    5
}

/// One notification destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSection {
    pub webhook_url: Url,
    #[serde(default)]
    pub channel: Option<String>,
    /// Participant-name decorations applied for this sink only.
    #[serde(default)]
    pub decorations: BTreeMap<String, String>,
}
