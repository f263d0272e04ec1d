use serde_json::json;
use session_backend::{BackendError, SessionBackend};
use session_backend_http::{HttpBackendConfig, HttpSessionBackend};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> HttpSessionBackend {
    HttpSessionBackend::new(HttpBackendConfig::new(server.uri()))
        .expect("backend should build for mock server")
}

#[tokio::test]
async fn fetch_session_decodes_message_log() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions/s-1"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session": {"id": "s-1", "workspace": "/work/repo"},
            "messages": [
                {"id": "m1", "role": "user", "content": "hi", "parent_id": null, "parentId": null},
                {"id": "m2", "role": "model", "content": "hello", "parent_id": "m1", "parentId": "m1"},
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = backend_for(&server)
        .fetch_session("s-1")
        .await
        .expect("session should load");

    assert_eq!(payload.messages.len(), 2);
    assert!(payload.messages[0].has_parent_field());
    assert_eq!(payload.messages[1].parent_candidate(), Some(&json!("m1")));
    assert_eq!(payload.workspace().as_deref(), Some("/work/repo"));
}

#[tokio::test]
async fn fetch_session_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "Session not found"})),
        )
        .mount(&server)
        .await;

    let error = backend_for(&server)
        .fetch_session("missing")
        .await
        .expect_err("missing session should fail");

    assert_eq!(error, BackendError::not_found("missing"));
}

#[tokio::test]
async fn server_errors_surface_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions/s-1"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "Failed to fetch session"})),
        )
        .mount(&server)
        .await;

    let error = backend_for(&server)
        .fetch_session("s-1")
        .await
        .expect_err("server error should fail");

    assert_eq!(error, BackendError::status(500, "Failed to fetch session"));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let error = backend_for(&server)
        .list_sessions()
        .await
        .expect_err("garbage body should fail");

    assert!(matches!(error, BackendError::Decode(_)));
}

#[tokio::test]
async fn session_lists_read_both_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "s-1", "title": "Persisted", "updated_at": "2026-01-02T00:00:00Z"},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/sessions/core"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "core-1", "title": "Core", "isCore": true, "lastUpdated": "2026-01-03T00:00:00Z"},
        ])))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let persisted = backend.list_sessions().await.expect("persisted list");
    let core = backend.list_core_sessions().await.expect("core list");

    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].title.as_deref(), Some("Persisted"));
    assert_eq!(core.len(), 1);
    assert!(core[0].is_core);
}

#[tokio::test]
async fn job_status_sends_session_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/status"))
        .and(query_param("sessionId", "s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hasRunningJobs": true})))
        .expect(1)
        .mount(&server)
        .await;

    let status = backend_for(&server)
        .job_status("s-1")
        .await
        .expect("status should load");

    assert!(status.has_running_jobs);
}

#[tokio::test]
async fn delete_session_issues_delete_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/sessions/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    backend_for(&server)
        .delete_session("s-1")
        .await
        .expect("delete should succeed");
}

#[tokio::test]
async fn configured_headers_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .and(header("user-agent", "desktop-shell/2.1"))
        .and(header("x-client-id", "tab-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpBackendConfig::new(format!("{}/api/", server.uri()))
        .with_user_agent("desktop-shell/2.1")
        .insert_header("X-Client-Id", "tab-7");
    let backend = HttpSessionBackend::new(config).expect("backend should build");

    assert!(backend
        .list_sessions()
        .await
        .expect("list should load")
        .is_empty());
}
