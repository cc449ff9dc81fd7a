//! src/pool/config.rs
//!
//! Configuration for `ThreadPool` construction.
//!
//! Example:
//! ```ignore
//! let config = PoolConfig::builder()
//!     .num_workers(3)
//!     .thread_name("kernel")
//!     .build();
//! let pool = ThreadPool::with_config(config)?;
//! ```
//!
//! # Notes
//! - `num_workers` counts the long-lived threads only. The caller always takes
//!   part in a round, so `num_workers = 3` runs work on four threads.
//! - Leaving `num_workers` unset uses one worker less than the hardware reports.

use anyhow::{anyhow, Context, Result};
use std::thread;

/// Environment variable that overrides the hardware-derived worker count.
pub const NUM_WORKERS_ENV: &str = "FORK_POOL_NUM_WORKERS";

const DEFAULT_THREAD_NAME: &str = "fork-pool-worker";

/// Configuration for ThreadPool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of long-lived worker threads (defaults to hardware threads - 1)
    pub num_workers: Option<usize>,
    /// Prefix for worker thread names; workers are named `"{prefix}-{index}"`
    pub thread_name: String,
    /// Stack size for worker threads, in bytes (platform default if unset)
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Default configuration with `num_workers` taken from
    /// `FORK_POOL_NUM_WORKERS` when it is set.
    pub fn from_env() -> Result<Self> {
        let num_workers = match std::env::var(NUM_WORKERS_ENV) {
            Ok(value) => Some(
                parse_num_workers(&value)
                    .with_context(|| format!("Invalid {}", NUM_WORKERS_ENV))?,
            ),
            Err(std::env::VarError::NotPresent) => None,
            Err(e) => return Err(anyhow!("Cannot read {}: {}", NUM_WORKERS_ENV, e)),
        };

        Ok(Self {
            num_workers,
            ..Self::default()
        })
    }

    /// The worker count this configuration resolves to.
    pub fn resolved_num_workers(&self) -> usize {
        self.num_workers.unwrap_or_else(default_num_workers)
    }
}

/// One worker per hardware thread, minus the caller's, and never fewer than one.
pub fn default_num_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Parses a worker count; it must be a positive integer.
pub fn parse_num_workers(value: &str) -> Result<usize> {
    let workers: usize = value
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a worker count", value))?;
    if workers == 0 {
        return Err(anyhow!("worker count must be greater than 0"));
    }
    Ok(workers)
}

/// Builder for PoolConfig with method chaining
#[derive(Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    /// Set the number of long-lived workers (must be > 0)
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = Some(workers);
        self
    }

    /// Set the worker thread name prefix
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Set the worker stack size in bytes.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = Some(bytes);
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PoolConfig {
        self.config
    }
}
