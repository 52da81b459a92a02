//! Runtime configuration from environment variables
//!
//! | Variable                     | Default | Meaning                                  |
//! |------------------------------|---------|------------------------------------------|
//! | `REFSCOPE_WORKER_THREADS`    | `2`     | representation worker threads            |
//! | `REFSCOPE_UI_POLL_INTERVAL`  | `0.2`   | seconds between handoff drains           |
//! | `REFSCOPE_MEMLIMIT_MB`       | `1024`  | address-space headroom, `0` disables     |
//! | `REFSCOPE_LOG_FILE`          | unset   | write logs to this file                  |
//!
//! Unset or empty variables take the default.

use crate::bridge::BridgeConfig;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_WORKER_THREADS: &str = "REFSCOPE_WORKER_THREADS";
pub const ENV_POLL_INTERVAL: &str = "REFSCOPE_UI_POLL_INTERVAL";
pub const ENV_MEMLIMIT_MB: &str = "REFSCOPE_MEMLIMIT_MB";
pub const ENV_LOG_FILE: &str = "REFSCOPE_LOG_FILE";

/// Session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub worker_threads: usize,
    pub poll_interval: Duration,
    pub memlimit_mb: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            poll_interval: Duration::from_millis(200),
            memlimit_mb: 1024,
            log_file: None,
        }
    }
}

impl Config {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read variables through `lookup`, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(raw) = get(ENV_WORKER_THREADS) {
            let threads: usize = parse(ENV_WORKER_THREADS, &raw, "a positive integer")?;
            if threads == 0 {
                return Err(invalid(ENV_WORKER_THREADS, &raw, "a positive integer"));
            }
            config.worker_threads = threads;
        }

        if let Some(raw) = get(ENV_POLL_INTERVAL) {
            let secs: f64 = parse(ENV_POLL_INTERVAL, &raw, "a positive number of seconds")?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(invalid(ENV_POLL_INTERVAL, &raw, "a positive number of seconds"));
            }
            config.poll_interval = Duration::from_secs_f64(secs);
        }

        if let Some(raw) = get(ENV_MEMLIMIT_MB) {
            config.memlimit_mb = parse(ENV_MEMLIMIT_MB, &raw, "a whole number of megabytes")?;
        }

        config.log_file = get(ENV_LOG_FILE).map(PathBuf::from);

        Ok(config)
    }

    /// Sizing for the presentation bridge
    pub fn bridge(&self) -> BridgeConfig {
        BridgeConfig {
            worker_threads: self.worker_threads,
            ..BridgeConfig::default()
        }
    }
}

fn parse<T: FromStr>(var: &'static str, raw: &str, expected: &'static str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid(var, raw, expected))
}

fn invalid(var: &'static str, raw: &str, expected: &'static str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: raw.to_string(),
        expected,
    }
}
