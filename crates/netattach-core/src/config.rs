//! Configuration types for the reconciliation engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Strategy for reconciling firewall rule sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStrategy {
    /// Create and delete individual rules; the only rules touched are the
    /// ones that actually changed
    #[default]
    Surgical,

    /// Delete every observed rule, then create every desired rule. For
    /// platforms that cannot reliably address individual rules. Deletions
    /// are best-effort; creation failures abort.
    FullReplace,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of attempts for an attachment create classified as transient,
    /// before falling back to candidate addresses
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between retry attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Interval between status polls (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// How firewall rule sets are reconciled
    #[serde(default)]
    pub rule_strategy: RuleStrategy,

    /// Capacity of the internal event channel
    ///
    /// When full, new engine events are dropped (with a warning log) rather
    /// than blocking plan execution.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::validation("max_attempts must be > 0"));
        }
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::validation("poll_interval_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::validation(
                "event_channel_capacity must be > 0",
            ));
        }
        Ok(())
    }

    /// Retry backoff as a [`Duration`]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Status poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            rule_strategy: RuleStrategy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    1000
}
