//! Worker configuration.
//!
//! Loaded from an optional file plus `MESSAGE_STORE__*` environment
//! variables, e.g. `MESSAGE_STORE__AGGREGATOR__BATCH_SIZE=500`.

use std::time::Duration;

use serde::Deserialize;

pub const ENV_PREFIX: &str = "MESSAGE_STORE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub read_models: ReadModelsConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite file holding the message log; `:memory:` for a private database.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadModelsConfig {
    #[serde(default = "default_read_models_path")]
    pub path: String,
}

impl Default for ReadModelsConfig {
    fn default() -> Self {
        Self {
            path: default_read_models_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Messages fetched per catch-up batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Wait between polls once an aggregator is caught up.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl AggregatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives, e.g. `info` or `message_store=debug`. `RUST_LOG`
    /// takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_store_path() -> String {
    "message_store.db".to_string()
}

fn default_read_models_path() -> String {
    "read_models.db".to_string()
}

fn default_batch_size() -> usize {
    crate::aggregator::DEFAULT_BATCH_SIZE
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load from the environment only.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::builder(None).build()?.try_deserialize()
    }

    /// Load from `path` (format from its extension), with environment
    /// variables overriding file values.
    pub fn from_file(path: &str) -> Result<Self, ::config::ConfigError> {
        Self::builder(Some(path)).build()?.try_deserialize()
    }

    fn builder(path: Option<&str>) -> ::config::ConfigBuilder<::config::builder::DefaultState> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }
        builder.add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
    }
}
