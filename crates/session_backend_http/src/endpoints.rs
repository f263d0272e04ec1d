use url::Url;

use crate::error::HttpBackendError;

/// Default base URL of the session service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Normalize a base URL to the service's `/api` root.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_BASE_URL`]
/// 2) trailing slashes are dropped
/// 3) `/api` is appended unless the path already ends with it
pub fn normalize_base_url(input: &str) -> Result<Url, HttpBackendError> {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    let api_root = if trimmed.ends_with("/api") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api")
    };

    let url = Url::parse(&api_root)
        .map_err(|error| HttpBackendError::InvalidBaseUrl(format!("{base}: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HttpBackendError::InvalidBaseUrl(format!(
            "{base}: unsupported scheme '{}'",
            url.scheme()
        )));
    }

    Ok(url)
}

/// `GET|DELETE {api}/sessions/{id}`
pub fn session_url(api_root: &Url, session_id: &str) -> Result<Url, HttpBackendError> {
    endpoint(api_root, &["sessions", session_id])
}

/// `GET {api}/sessions`
pub fn sessions_url(api_root: &Url) -> Result<Url, HttpBackendError> {
    endpoint(api_root, &["sessions"])
}

/// `GET {api}/sessions/core`
pub fn core_sessions_url(api_root: &Url) -> Result<Url, HttpBackendError> {
    endpoint(api_root, &["sessions", "core"])
}

/// `GET {api}/chat/status?sessionId={id}`
pub fn job_status_url(api_root: &Url, session_id: &str) -> Result<Url, HttpBackendError> {
    let mut url = endpoint(api_root, &["chat", "status"])?;
    url.query_pairs_mut().append_pair("sessionId", session_id);
    Ok(url)
}

fn endpoint(api_root: &Url, segments: &[&str]) -> Result<Url, HttpBackendError> {
    let mut url = api_root.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            HttpBackendError::InvalidBaseUrl(format!("{api_root} cannot be a base URL"))
        })?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}
