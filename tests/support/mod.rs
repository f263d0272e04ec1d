#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chat_tree::{ChatController, RawMessageRecord, SessionPayload};
use session_backend_mock::{MockSessionBackend, RecordingDispatcher};

pub struct Harness {
    pub controller: ChatController,
    pub backend: Arc<MockSessionBackend>,
    pub dispatcher: Arc<RecordingDispatcher>,
}

pub fn harness(backend: MockSessionBackend) -> Harness {
    let backend = Arc::new(backend);
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let controller = ChatController::new(backend.clone(), dispatcher.clone());
    Harness {
        controller,
        backend,
        dispatcher,
    }
}

/// `[id0 <- id1 <- ...]` with explicit parent fields.
pub fn explicit_chain(ids: &[&str]) -> SessionPayload {
    let mut parent: Option<&str> = None;
    let records = ids
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let role = if index % 2 == 0 { "user" } else { "model" };
            let record = RawMessageRecord::new(*id, role, format!("content of {id}"))
                .with_parent(parent);
            parent = Some(*id);
            record
        })
        .collect();
    SessionPayload::new(records)
}

/// Records without any parent field, so hydration chains them in order.
pub fn flat_log(ids: &[&str]) -> SessionPayload {
    SessionPayload::new(
        ids.iter()
            .map(|id| RawMessageRecord::new(*id, "user", format!("content of {id}")))
            .collect(),
    )
}

/// Lets spawned tasks on the current-thread runtime run until they block.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

pub async fn wait_for_fetch(backend: &MockSessionBackend, session_id: &str, count: usize) {
    for _ in 0..200 {
        if backend.fetch_count(session_id) >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("session {session_id} was not fetched {count} time(s)");
}

pub async fn wait_for_status_check(backend: &MockSessionBackend, session_id: &str, count: usize) {
    for _ in 0..200 {
        let seen = backend
            .calls()
            .status_checks
            .iter()
            .filter(|checked| checked.as_str() == session_id)
            .count();
        if seen >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("job status of {session_id} was not checked {count} time(s)");
}
