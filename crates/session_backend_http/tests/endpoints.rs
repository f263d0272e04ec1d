use session_backend_http::endpoints::{
    core_sessions_url, job_status_url, session_url, sessions_url,
};
use session_backend_http::{normalize_base_url, HttpBackendError};

#[test]
fn base_url_normalization_appends_api_root() {
    let url = normalize_base_url("http://localhost:3000").expect("valid base url");
    assert_eq!(url.as_str(), "http://localhost:3000/api");
}

#[test]
fn base_url_normalization_keeps_existing_api_root_and_drops_trailing_slash() {
    let url = normalize_base_url("https://chat.example.com/api/").expect("valid base url");
    assert_eq!(url.as_str(), "https://chat.example.com/api");
}

#[test]
fn base_url_normalization_falls_back_to_default_for_blank_input() {
    let url = normalize_base_url("   ").expect("default base url");
    assert_eq!(url.as_str(), "http://localhost:3000/api");
}

#[test]
fn base_url_normalization_rejects_non_http_schemes() {
    let error = normalize_base_url("ftp://files.example.com").expect_err("ftp must be rejected");
    assert!(matches!(error, HttpBackendError::InvalidBaseUrl(_)));
}

#[test]
fn endpoint_builders_match_session_service_routes() {
    let root = normalize_base_url("http://localhost:3000").expect("valid base url");

    assert_eq!(
        session_url(&root, "abc-123").expect("session url").as_str(),
        "http://localhost:3000/api/sessions/abc-123"
    );
    assert_eq!(
        sessions_url(&root).expect("sessions url").as_str(),
        "http://localhost:3000/api/sessions"
    );
    assert_eq!(
        core_sessions_url(&root).expect("core url").as_str(),
        "http://localhost:3000/api/sessions/core"
    );
    assert_eq!(
        job_status_url(&root, "abc-123").expect("status url").as_str(),
        "http://localhost:3000/api/chat/status?sessionId=abc-123"
    );
}

#[test]
fn endpoint_builders_percent_encode_session_ids() {
    let root = normalize_base_url("http://localhost:3000").expect("valid base url");

    assert_eq!(
        session_url(&root, "a/b c").expect("session url").as_str(),
        "http://localhost:3000/api/sessions/a%2Fb%20c"
    );
    assert_eq!(
        job_status_url(&root, "a&b").expect("status url").as_str(),
        "http://localhost:3000/api/chat/status?sessionId=a%26b"
    );
}
