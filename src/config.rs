//! Crawler configuration.
//!
//! Every field has a default, so an empty YAML file (or no file at all) yields
//! a working configuration:
//!
//! ```yaml
//! max_at_once: 10
//! max_per_second: 10
//! retry:
//!   max_attempts: 3
//!   backoff_factor: 1.0
//!   max_backoff_wait_secs: 30
//! transport:
//!   timeout_secs: 20
//!   user_agent: "trace_crawler/0.1"
//! ```

use crate::client::RetryPolicy;
use crate::error::{CrawlError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Hard ceiling on concurrently running article fetches.
    pub max_at_once: usize,
    /// Maximum article fetches started per second.
    pub max_per_second: usize,
    pub retry: RetryConfig,
    pub transport: TransportConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_at_once: 10,
            max_per_second: 10,
            retry: RetryConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub max_backoff_wait_secs: f64,
}

impl Default for RetryConfig {
    /// Crawl defaults.
    fn default() -> Self {
        let policy = RetryPolicy::crawl();
        Self {
            max_attempts: policy.max_attempts,
            backoff_factor: policy.backoff_factor,
            max_backoff_wait_secs: policy.max_backoff_wait.as_secs_f64(),
        }
    }
}

/// Settings for the base HTTP transport. No timeout unless one is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

impl CrawlerConfig {
    /// Load and validate a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_yaml(&raw)?;
        info!(?config, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: CrawlerConfig = if raw.trim().is_empty() {
            CrawlerConfig::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_at_once == 0 {
            return Err(CrawlError::Configuration(
                "max_at_once must be at least 1".to_string(),
            ));
        }
        if self.max_per_second == 0 {
            return Err(CrawlError::Configuration(
                "max_per_second must be at least 1".to_string(),
            ));
        }
        self.retry.validate()
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy {
            max_attempts: self.retry.max_attempts,
            backoff_factor: self.retry.backoff_factor,
            max_backoff_wait: self.retry.max_backoff_wait()?,
        })
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(CrawlError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(CrawlError::Configuration(format!(
                "retry.backoff_factor must be a non-negative number, got {}",
                self.backoff_factor
            )));
        }
        self.max_backoff_wait().map(|_| ())
    }

    fn max_backoff_wait(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.max_backoff_wait_secs).map_err(|e| {
            CrawlError::Configuration(format!(
                "retry.max_backoff_wait_secs must be a non-negative number of seconds, got {}: {e}",
                self.max_backoff_wait_secs
            ))
        })
    }
}
