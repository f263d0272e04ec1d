//! Environment configuration.

use std::env;
use std::time::Duration;

pub const POLL_INTERVAL_ENV_VAR: &str = "CHAT_TREE_POLL_INTERVAL_MS";
pub const LOG_FILTER_ENV_VAR: &str = "CHAT_TREE_LOG";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTreeConfig {
    /// Interval between job-status checks while the host view is hidden.
    pub poll_interval: Duration,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ChatTreeConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ChatTreeConfig {
    /// Zero, negative, and unparsable intervals fall back to the default.
    pub fn from_env() -> Self {
        Self {
            poll_interval: env_millis_opt(POLL_INTERVAL_ENV_VAR).unwrap_or(DEFAULT_POLL_INTERVAL),
            log_filter: env_string_opt(LOG_FILTER_ENV_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

fn env_millis_opt(key: &str) -> Option<Duration> {
    env_string_opt(key)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
