//! Configuration module for the matchday binary.
//!
//! Handles loading the TOML file, applying CLI overrides, validating, and
//! converting the file shapes into the core's runtime types.

pub mod file;

use file::{FileConfig, SourceSection};
use matchday_core::processors::{LifetimeMode, PollConfig};
use matchday_core::sinks::SinkConfig;
use matchday_core::tracker::TrackerConfig;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("payload template is not representable as JSON: {0}")]
    Template(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// CLI overrides applied on top of the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub interval_secs: Option<u64>,
    pub unbounded: bool,
}

/// Fully resolved configuration, in the core's terms.
pub struct LoadedConfig {
    pub source: SourceSection,
    pub tracker: TrackerConfig,
    pub poll: PollConfig,
    pub delivery_concurrency: usize,
    pub payload_template: serde_json::Value,
    pub sinks: Vec<SinkConfig>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            overrides,
        }
    }

    /// Read the TOML file, apply CLI overrides, validate, and resolve.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&content)?;
        validate(&file_config)?;
        build(file_config, self.overrides)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.sinks.is_empty() {
        return Err(ConfigError::Validation(
            "at least one sink must be configured".into(),
        ));
    }
    if config.poll.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "poll.interval_secs must be at least 1".into(),
        ));
    }
    if config.delivery.concurrency == 0 {
        return Err(ConfigError::Validation(
            "delivery.concurrency must be at least 1".into(),
        ));
    }
    Ok(())
}

fn build(config: FileConfig, overrides: Overrides) -> Result<LoadedConfig, ConfigError> {
    let interval_secs = overrides
        .interval_secs
        .unwrap_or(config.poll.interval_secs)
        .max(1);
    let lifetime = if overrides.unbounded || !config.poll.bounded {
        LifetimeMode::Unbounded
    } else {
        LifetimeMode::Bounded
    };
    let ceiling_secs = config
        .source
        .completion_ceiling_secs
        .unwrap_or_else(|| config.source.kind.default_completion_ceiling_secs());

    let payload_template = match &config.delivery.payload_template {
        Some(table) => serde_json::to_value(table)?,
        None => serde_json::Value::Null,
    };

    let sinks = config
        .sinks
        .iter()
        .map(|s| SinkConfig {
            webhook_url: s.webhook_url.clone(),
            channel: s.channel.clone(),
            decorations: s.decorations.clone(),
        })
        .collect();

    Ok(LoadedConfig {
        tracker: TrackerConfig {
            completion_ceiling: Duration::from_secs(ceiling_secs),
        },
        poll: PollConfig {
            interval: Duration::from_secs(interval_secs),
            jitter: Duration::from_secs(config.poll.jitter_secs),
            startup_grace: Duration::from_secs(config.poll.startup_grace_secs),
            lifetime,
        },
        delivery_concurrency: config.delivery.concurrency,
        payload_template,
        sinks,
        source: config.source,
    })
}
