mod support;

use chat_tree::{BackendError, BranchError, SessionPatch, SessionSummary, SwitchOutcome};
use pretty_assertions::assert_eq;
use session_backend_mock::MockSessionBackend;
use support::{flat_log, harness, wait_for_fetch};

fn two_sessions() -> MockSessionBackend {
    MockSessionBackend::new()
        .with_session("s-1", flat_log(&["a1", "a2"]))
        .with_session("s-2", flat_log(&["b1", "b2", "b3"]))
}

fn listed_ids(sessions: &[SessionSummary]) -> Vec<&str> {
    sessions.iter().map(|summary| summary.id.as_str()).collect()
}

#[tokio::test]
async fn slow_switch_is_discarded_once_a_newer_switch_commits() {
    let h = harness(two_sessions());
    h.backend.gate_session("s-1");

    let slow = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.select_session("s-1").await }
    });
    wait_for_fetch(&h.backend, "s-1", 1).await;
    assert!(h.controller.is_session_loading());

    let fast = h
        .controller
        .select_session("s-2")
        .await
        .expect("s-2 should hydrate");
    assert_eq!(
        fast,
        SwitchOutcome::Switched {
            head: Some("b3".to_string())
        }
    );

    h.backend.release_session("s-1");
    let outcome = slow
        .await
        .expect("switch task should join")
        .expect("stale switch is not an error");

    assert_eq!(outcome, SwitchOutcome::Stale);
    assert_eq!(h.controller.current_session_id().as_deref(), Some("s-2"));
    assert_eq!(h.controller.path().ids(), vec!["b1", "b2", "b3"]);
    assert!(!h.controller.is_session_loading());
}

#[tokio::test]
async fn new_chat_supersedes_in_flight_switch() {
    let h = harness(two_sessions());
    h.backend.gate_session("s-1");

    let slow = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.select_session("s-1").await }
    });
    wait_for_fetch(&h.backend, "s-1", 1).await;

    h.controller.new_chat();
    h.backend.release_session("s-1");

    assert_eq!(
        slow.await
            .expect("switch task should join")
            .expect("stale switch is not an error"),
        SwitchOutcome::Stale
    );
    assert_eq!(h.controller.current_session_id(), None);
    assert!(h.controller.path().is_empty());
}

#[tokio::test]
async fn failed_switch_keeps_previous_session() {
    let h = harness(two_sessions());
    h.controller
        .select_session("s-1")
        .await
        .expect("s-1 should hydrate");
    h.backend.fail_session("s-2");

    let error = h
        .controller
        .select_session("s-2")
        .await
        .expect_err("failing fetch should surface");

    assert_eq!(
        error,
        BranchError::hydration("s-2", BackendError::status(500, "Failed to fetch session"))
    );
    assert_eq!(h.controller.current_session_id().as_deref(), Some("s-1"));
    assert_eq!(h.controller.path().ids(), vec!["a1", "a2"]);
    assert!(!h.controller.is_session_loading());
}

#[tokio::test]
async fn selecting_current_session_does_not_refetch() {
    let h = harness(two_sessions());
    h.controller
        .select_session("s-1")
        .await
        .expect("s-1 should hydrate");

    let again = h
        .controller
        .select_session("s-1")
        .await
        .expect("no-op switch");

    assert_eq!(again, SwitchOutcome::AlreadyCurrent);
    assert_eq!(h.backend.fetch_count("s-1"), 1);
}

#[tokio::test]
async fn missing_session_reports_not_found() {
    let h = harness(two_sessions());

    let error = h
        .controller
        .select_session("gone")
        .await
        .expect_err("unknown session should fail");

    assert_eq!(error, BranchError::hydration("gone", BackendError::not_found("gone")));
    assert_eq!(error.session_id(), Some("gone"));
    assert_eq!(h.controller.current_session_id(), None);
}

#[tokio::test]
async fn new_chat_clears_tree_but_keeps_queue() {
    let h = harness(two_sessions());
    h.controller
        .select_session("s-1")
        .await
        .expect("s-1 should hydrate");
    h.controller
        .enqueue("later", Vec::new())
        .expect("session is active");

    h.controller.new_chat_in_workspace("/work/next");

    assert_eq!(h.controller.current_session_id(), None);
    assert_eq!(h.controller.current_workspace().as_deref(), Some("/work/next"));
    assert_eq!(h.controller.head(), None);
    assert!(h.controller.path().is_empty());
    assert_eq!(h.controller.pending().len(), 1);

    h.controller.new_chat();
    assert_eq!(h.controller.current_workspace(), None);
}

#[tokio::test]
async fn deleting_current_session_resets_and_drops_its_queue() {
    let h = harness(two_sessions());
    h.backend.set_summaries(
        vec![
            SessionSummary::new("s-1", "one"),
            SessionSummary::new("s-2", "two"),
        ],
        Vec::new(),
    );
    h.controller
        .refresh_sessions()
        .await
        .expect("lists should load");
    h.controller
        .select_session("s-1")
        .await
        .expect("s-1 should hydrate");
    h.controller
        .enqueue("never sent", Vec::new())
        .expect("session is active");

    h.controller
        .delete_session("s-1")
        .await
        .expect("delete should succeed");

    assert_eq!(h.backend.calls().deletes, vec!["s-1".to_string()]);
    assert_eq!(listed_ids(&h.controller.sessions()), vec!["s-2"]);
    assert_eq!(h.controller.current_session_id(), None);
    assert!(h.controller.path().is_empty());
    assert!(h.controller.pending().is_empty());
}

#[tokio::test]
async fn deleting_other_session_keeps_current() {
    let h = harness(two_sessions());
    h.controller
        .select_session("s-1")
        .await
        .expect("s-1 should hydrate");

    h.controller
        .delete_session("s-2")
        .await
        .expect("delete should succeed");

    assert_eq!(h.controller.current_session_id().as_deref(), Some("s-1"));
    assert_eq!(h.controller.path().ids(), vec!["a1", "a2"]);
}

#[tokio::test]
async fn refresh_merges_sources_newest_first() {
    let h = harness(two_sessions());
    h.backend.set_summaries(
        vec![
            SessionSummary::new("old", "persisted").with_updated_at("2024-01-01T00:00:00Z"),
            SessionSummary::new("dup", "persisted copy"),
        ],
        vec![
            SessionSummary::new("dup", "core copy")
                .core()
                .with_updated_at(1_900_000_000_000_i64),
            SessionSummary::new("live", "core")
                .core()
                .with_updated_at(1_800_000_000_000_i64),
        ],
    );

    let count = h
        .controller
        .refresh_sessions()
        .await
        .expect("lists should load");

    let sessions = h.controller.sessions();
    assert_eq!(count, 3);
    assert_eq!(listed_ids(&sessions), vec!["live", "old", "dup"]);
    assert_eq!(sessions[2].title.as_deref(), Some("persisted copy"));
}

#[tokio::test]
async fn refresh_tolerates_one_failing_source() {
    let h = harness(two_sessions());
    h.backend.set_summaries(
        vec![SessionSummary::new("p", "persisted")],
        vec![SessionSummary::new("c", "core").core()],
    );
    h.backend.fail_lists(false, true);

    let count = h
        .controller
        .refresh_sessions()
        .await
        .expect("one source is enough");

    assert_eq!(count, 1);
    assert_eq!(listed_ids(&h.controller.sessions()), vec!["p"]);
}

#[tokio::test]
async fn refresh_fails_when_both_sources_fail_and_keeps_old_list() {
    let h = harness(two_sessions());
    h.backend
        .set_summaries(vec![SessionSummary::new("p", "persisted")], Vec::new());
    h.controller
        .refresh_sessions()
        .await
        .expect("first refresh should load");
    h.backend.fail_lists(true, true);

    let error = h
        .controller
        .refresh_sessions()
        .await
        .expect_err("both sources down");

    assert!(matches!(error, BranchError::SessionList { .. }));
    assert_eq!(listed_ids(&h.controller.sessions()), vec!["p"]);
}

#[tokio::test]
async fn local_session_edit_retitles_and_resorts() {
    let h = harness(two_sessions());
    h.backend.set_summaries(
        vec![
            SessionSummary::new("a", "first").with_updated_at("2024-05-01T00:00:00Z"),
            SessionSummary::new("b", "second").with_updated_at("2024-01-01T00:00:00Z"),
        ],
        Vec::new(),
    );
    h.controller
        .refresh_sessions()
        .await
        .expect("lists should load");
    assert_eq!(listed_ids(&h.controller.sessions()), vec!["a", "b"]);

    let applied = h.controller.update_session(
        "b",
        SessionPatch::title("renamed").with_updated_at("2024-06-01T00:00:00Z"),
    );

    assert!(applied);
    let sessions = h.controller.sessions();
    assert_eq!(listed_ids(&sessions), vec!["b", "a"]);
    assert_eq!(sessions[0].title.as_deref(), Some("renamed"));
    assert!(!h.controller.update_session("missing", SessionPatch::title("x")));
}
