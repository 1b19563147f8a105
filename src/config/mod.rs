//! # Recompute Configuration
//!
//! Explicit, validated configuration for the batch orchestrator. Values come
//! from serde-deserializable documents (JSON in tests, whatever the embedding
//! service provides in production) with environment-variable overrides, and
//! every knob has the reference default so a bare `RecomputeConfig::default()`
//! reproduces the original jobs' behavior: 5 second poll interval, 50
//! concurrent record-level workers, 10 concurrent bulk-file workers, a 3
//! month lookback window, and no polling deadline.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{BatchError, Result};

const ENV_PREFIX: &str = "RECOMPUTE";

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_record_concurrency() -> usize {
    50
}

fn default_bulk_concurrency() -> usize {
    10
}

fn default_lookback_months() -> u32 {
    3
}

/// Tunables shared by every batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeConfig {
    /// Fixed delay between statement status checks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound on the total wait for one statement to reach a terminal
    /// status. `None` preserves the reference behavior of waiting forever.
    #[serde(default)]
    pub poll_deadline_secs: Option<u64>,

    /// Concurrency ceiling for per-record fan-out (forecast, distance).
    #[serde(default = "default_record_concurrency")]
    pub record_concurrency: usize,

    /// Concurrency ceiling for bulk file fan-out (archive ingestion).
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,

    /// Lookback window, in months, handed to the forecast sub-computation.
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
}

impl Default for RecomputeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            poll_deadline_secs: None,
            record_concurrency: default_record_concurrency(),
            bulk_concurrency: default_bulk_concurrency(),
            lookback_months: default_lookback_months(),
        }
    }
}

impl RecomputeConfig {
    /// Build a config from defaults plus `RECOMPUTE_*` environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = read_env_u64("POLL_INTERVAL_SECS")? {
            config.poll_interval_secs = v;
        }
        if let Some(v) = read_env_u64("POLL_DEADLINE_SECS")? {
            config.poll_deadline_secs = Some(v);
        }
        if let Some(v) = read_env_u64("RECORD_CONCURRENCY")? {
            config.record_concurrency = env_value_in_range("RECORD_CONCURRENCY", v)?;
        }
        if let Some(v) = read_env_u64("BULK_CONCURRENCY")? {
            config.bulk_concurrency = env_value_in_range("BULK_CONCURRENCY", v)?;
        }
        if let Some(v) = read_env_u64("LOOKBACK_MONTHS")? {
            config.lookback_months = env_value_in_range("LOOKBACK_MONTHS", v)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a config document, falling back to defaults per field.
    pub fn from_json(document: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(document).map_err(|e| {
            BatchError::Configuration {
                message: format!("invalid config document: {e}"),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.record_concurrency == 0 {
            return Err(BatchError::Configuration {
                message: "record_concurrency must be at least 1".to_string(),
            });
        }
        if self.bulk_concurrency == 0 {
            return Err(BatchError::Configuration {
                message: "bulk_concurrency must be at least 1".to_string(),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(BatchError::Configuration {
                message: "poll_interval_secs must be at least 1".to_string(),
            });
        }
        if let Some(deadline) = self.poll_deadline_secs {
            if deadline < self.poll_interval_secs {
                return Err(BatchError::Configuration {
                    message: format!(
                        "poll_deadline_secs ({deadline}) is shorter than poll_interval_secs ({})",
                        self.poll_interval_secs
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_deadline(&self) -> Option<Duration> {
        self.poll_deadline_secs.map(Duration::from_secs)
    }
}

fn env_value_in_range<T: TryFrom<u64>>(key: &str, value: u64) -> Result<T> {
    T::try_from(value).map_err(|_| BatchError::Configuration {
        message: format!("{ENV_PREFIX}_{key} out of range: {value}"),
    })
}

fn read_env_u64(key: &str) -> Result<Option<u64>> {
    let full_key = format!("{ENV_PREFIX}_{key}");
    match env::var(&full_key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| BatchError::Configuration {
                message: format!("{full_key} must be an unsigned integer, got {raw:?}"),
            }),
        Err(_) => Ok(None),
    }
}
