//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{ChatTreeConfig, DEFAULT_LOG_FILTER};

/// Installs a stderr fmt subscriber.
///
/// `RUST_LOG` wins over [`ChatTreeConfig::log_filter`]; an unparsable filter
/// falls back to `info`. Returns `false` when a global subscriber was already
/// installed, so hosts that bring their own subscriber can call this safely.
pub fn init_tracing(config: &ChatTreeConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::init_tracing;
    use crate::config::ChatTreeConfig;

    #[test]
    fn second_install_reports_existing_subscriber() {
        let config = ChatTreeConfig {
            log_filter: "not a [valid filter".to_string(),
            ..ChatTreeConfig::default()
        };

        let _ = init_tracing(&config);
        assert!(!init_tracing(&ChatTreeConfig::default()));
    }
}
