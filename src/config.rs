//! Configuration objects
//!
//! The database location and the refresh tuning knobs are explicit values
//! passed into constructors, never ambient module state.

use crate::signal::DEFAULT_WINDOW;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Number of most-recent distinct trading dates covered by detection and
/// reporting.
pub const DEFAULT_LOOKBACK_DAYS: usize = 20;

/// Number of symbols fetched and processed per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Concurrent batch workers.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Busy timeout applied to the connection
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Refresh engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Trailing trading dates considered for detection and reporting
    pub lookback_days: usize,
    /// Symbols per batch
    pub batch_size: usize,
    /// Concurrent batch workers
    pub concurrency: usize,
    /// Detector look-back width in trading days
    pub window: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            window: DEFAULT_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_defaults() {
        let cfg = RefreshConfig::default();
        assert_eq!(cfg.lookback_days, 20);
        assert_eq!(cfg.batch_size, 100);
        assert_eq!(cfg.window, 5);
        assert!(cfg.concurrency >= 1);
    }

    #[test]
    fn test_db_config_timeout() {
        let cfg = DbConfig::new("/tmp/stocks.db");
        assert_eq!(cfg.busy_timeout(), Duration::from_millis(5_000));
    }
}
