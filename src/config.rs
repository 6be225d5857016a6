//! Configuration management for Tollgate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Result, TollgateError};
use crate::ratelimit::{Clock, TokenBucket};

/// Main configuration for the Tollgate binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Bucket configuration
    #[serde(default)]
    pub bucket: BucketConfig,

    /// Load simulation configuration
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for TollgateConfig {
    fn default() -> Self {
        Self {
            bucket: BucketConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Token bucket configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Maximum tokens the bucket can hold
    #[serde(default = "default_capacity")]
    pub capacity: u64,

    /// Tokens added per second
    #[serde(default = "default_fill_rate")]
    pub fill_rate: f64,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            fill_rate: default_fill_rate(),
        }
    }
}

impl BucketConfig {
    /// Build a bucket that reads the system clock.
    pub fn build(&self) -> Result<TokenBucket> {
        TokenBucket::new(self.capacity, self.fill_rate)
    }

    /// Build a bucket that reads the given clock.
    pub fn build_with_clock<C: Clock>(&self, clock: C) -> Result<TokenBucket<C>> {
        TokenBucket::with_clock(self.capacity, self.fill_rate, clock)
    }
}

fn default_capacity() -> u64 {
    10
}

fn default_fill_rate() -> f64 {
    1.0
}

/// Simulated load configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Requests issued by each worker
    #[serde(default = "default_requests_per_worker")]
    pub requests_per_worker: u64,

    /// Tokens requested per call
    #[serde(default = "default_cost")]
    pub cost: u64,

    /// Pause between a worker's requests in milliseconds, 0 for none
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            requests_per_worker: default_requests_per_worker(),
            cost: default_cost(),
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_requests_per_worker() -> u64 {
    100
}

fn default_cost() -> u64 {
    1
}

fn default_interval_ms() -> u64 {
    10
}

impl TollgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TollgateError::Config(format!("Failed to parse configuration: {}", e)))
    }
}
