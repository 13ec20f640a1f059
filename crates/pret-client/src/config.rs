//! # Client Configuration
//!
//! Loaded from YAML; every field has a default, so an empty document is a
//! valid configuration. `PRET_MAX_ATTEMPTS` and `PRET_EVENT_LOG` override
//! the file.
//!
//! ```yaml
//! retry:
//!   max_attempts: 5
//!   initial_backoff_ms: 100
//!   max_backoff_ms: 5000
//!   backoff_multiplier: 2.0
//! event_log_path: events.jsonl
//! mock_verifier_key: pret-mock-verifier
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding [`RetryPolicy::max_attempts`].
pub const ENV_MAX_ATTEMPTS: &str = "PRET_MAX_ATTEMPTS";
/// Environment variable overriding [`ClientConfig::event_log_path`].
pub const ENV_EVENT_LOG: &str = "PRET_EVENT_LOG";

/// Bounded exponential backoff for stale-view resubmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total submission attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately. Used by tests and simulation.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (1 = first retry).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff_ms as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                field: "retry.backoff_multiplier",
                reason: format!("must be a finite number >= 1, got {}", self.backoff_multiplier),
            });
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid {
                field: "retry.initial_backoff_ms",
                reason: format!(
                    "{} exceeds max_backoff_ms {}",
                    self.initial_backoff_ms, self.max_backoff_ms
                ),
            });
        }
        Ok(())
    }
}

/// Configuration for the submission pipeline and CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub retry: RetryPolicy,
    /// Where accepted events are written, if anywhere.
    pub event_log_path: Option<PathBuf>,
    /// Seed for the mock proof system's shared key.
    pub mock_verifier_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            event_log_path: None,
            mock_verifier_key: "pret-mock-verifier".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a YAML document. Environment overrides are not applied.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&text)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `PRET_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            self.retry.max_attempts = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: format!("{ENV_MAX_ATTEMPTS}={raw:?} is not an integer"),
            })?;
        }
        if let Some(path) = lookup(ENV_EVENT_LOG) {
            self.event_log_path = Some(PathBuf::from(path));
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        if self.mock_verifier_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "mock_verifier_key",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
