use crate::checkpoint::DEFAULT_CHECKPOINT_INTERVAL_MS;
use crate::retry::{RetryPolicy, DEFAULT_BACKOFF_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::threshold::{DEFAULT_ALERT_AFTER, DEFAULT_TEMPERATURE_THRESHOLD};
use serde::Deserialize;
use thiserror::Error;

/// Tunables for one shard processor. Every field falls back to the documented
/// default when absent from the configuration blob.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessorConfig {
    /// Temperatures strictly above this value count as breaches.
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    /// Number of highs after which alerts start firing.
    #[serde(default = "default_alert_after")]
    pub alert_after: u64,
    /// Total attempts per record / checkpoint operation.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    /// Fixed delay between retry attempts.
    #[serde(default = "default_backoff_delay_ms")]
    pub backoff_delay_ms: u64,
    /// Cadence for periodic cursor checkpoints.
    #[serde(default = "default_checkpoint_interval_ms")]
    pub checkpoint_interval_ms: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            alert_after: default_alert_after(),
            max_retry_attempts: default_max_retry_attempts(),
            backoff_delay_ms: default_backoff_delay_ms(),
            checkpoint_interval_ms: default_checkpoint_interval_ms(),
        }
    }
}

impl ProcessorConfig {
    /// Parses and validates a JSON configuration blob.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the processor cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retry_attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        if self.checkpoint_interval_ms == 0 {
            return Err(ConfigError::ZeroCheckpointInterval);
        }
        Ok(())
    }

    /// Retry settings shared by record processing and checkpointing.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            backoff_delay_ms: self.backoff_delay_ms,
        }
    }
}

fn default_threshold() -> i64 {
    DEFAULT_TEMPERATURE_THRESHOLD
}

fn default_alert_after() -> u64 {
    DEFAULT_ALERT_AFTER
}

fn default_max_retry_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_delay_ms() -> u64 {
    DEFAULT_BACKOFF_DELAY_MS
}

fn default_checkpoint_interval_ms() -> u64 {
    DEFAULT_CHECKPOINT_INTERVAL_MS
}

/// Errors surfaced while loading processor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid processor config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("max_retry_attempts must be at least 1")]
    ZeroRetryAttempts,
    #[error("checkpoint_interval_ms must be positive")]
    ZeroCheckpointInterval,
}
