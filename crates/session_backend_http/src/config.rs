use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use crate::endpoints::DEFAULT_BASE_URL;

pub const BACKEND_URL_ENV_VAR: &str = "CHAT_TREE_BACKEND_URL";
pub const BACKEND_TIMEOUT_ENV_VAR: &str = "CHAT_TREE_BACKEND_TIMEOUT_SEC";

/// Transport configuration for session service requests.
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL of the service; `/api` is appended when missing.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Reads `CHAT_TREE_BACKEND_URL` and `CHAT_TREE_BACKEND_TIMEOUT_SEC`.
    ///
    /// Blank values and non-positive or unparsable timeouts are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base_url) = env_string_opt(BACKEND_URL_ENV_VAR) {
            config.base_url = base_url;
        }
        config.timeout = env_string_opt(BACKEND_TIMEOUT_ENV_VAR)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs);
        config
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
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

#[cfg(test)]
mod tests {
    use std::env;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    use super::{HttpBackendConfig, BACKEND_TIMEOUT_ENV_VAR, BACKEND_URL_ENV_VAR};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn from_env_defaults_without_variables() {
        let _lock = env_lock();
        let _url = set_env_guard(BACKEND_URL_ENV_VAR, None);
        let _timeout = set_env_guard(BACKEND_TIMEOUT_ENV_VAR, None);

        let config = HttpBackendConfig::from_env();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn from_env_reads_url_and_positive_timeout() {
        let _lock = env_lock();
        let _url = set_env_guard(BACKEND_URL_ENV_VAR, Some("https://chat.internal"));
        let _timeout = set_env_guard(BACKEND_TIMEOUT_ENV_VAR, Some("30"));

        let config = HttpBackendConfig::from_env();
        assert_eq!(config.base_url, "https://chat.internal");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn from_env_ignores_zero_and_garbage_timeouts() {
        let _lock = env_lock();
        let _url = set_env_guard(BACKEND_URL_ENV_VAR, Some("   "));

        {
            let _timeout = set_env_guard(BACKEND_TIMEOUT_ENV_VAR, Some("0"));
            assert_eq!(HttpBackendConfig::from_env().timeout, None);
        }

        let _timeout = set_env_guard(BACKEND_TIMEOUT_ENV_VAR, Some("soon"));
        let config = HttpBackendConfig::from_env();
        assert_eq!(config.timeout, None);
        assert_eq!(config.base_url, "http://localhost:3000");
    }
}
