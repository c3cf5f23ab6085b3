//! Configuration for the dependency watcher.

use std::time::Duration;

use crate::models::constants::DEFAULT_POLL_INTERVAL_SECS;

/// Configuration for the dependency watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}
