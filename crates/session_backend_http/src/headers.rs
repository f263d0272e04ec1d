use std::collections::BTreeMap;

use crate::config::HttpBackendConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for session service requests.
///
/// Extra headers are trimmed and lower-cased and may override the defaults;
/// entries with a blank key are skipped.
pub fn build_headers(config: &HttpBackendConfig) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());

    let user_agent = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), user_agent);

    for (key, value) in &config.extra_headers {
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }
        headers.insert(key, value.trim().to_owned());
    }

    headers
}

fn default_user_agent() -> String {
    format!("chat_tree/{}", env!("CARGO_PKG_VERSION"))
}
