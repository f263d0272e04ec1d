//! Deterministic in-memory implementation of the `session_backend` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and contract-level integration testing of `chat_tree`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use session_backend::{
    BackendError, DispatchError, JobStatus, MessageDispatcher, SendOptions, SessionBackend,
    SessionPayload, SessionSummary,
};
use tokio::sync::Semaphore;

/// Every call the mock backend has served, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub fetches: Vec<String>,
    pub status_checks: Vec<String>,
    pub deletes: Vec<String>,
    pub list_calls: usize,
    pub core_list_calls: usize,
}

#[derive(Debug, Default)]
struct MockState {
    sessions: HashMap<String, SessionPayload>,
    persisted: Vec<SessionSummary>,
    core: Vec<SessionSummary>,
    running_jobs: HashSet<String>,
    failing_sessions: HashSet<String>,
    failing_persisted_list: bool,
    failing_core_list: bool,
    calls: MockCalls,
}

/// In-memory session backend with call recording and per-session fetch gates.
#[derive(Debug, Default)]
pub struct MockSessionBackend {
    state: Mutex<MockState>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    status_gates: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl MockSessionBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session payload served by `fetch_session`.
    #[must_use]
    pub fn with_session(self, session_id: impl Into<String>, payload: SessionPayload) -> Self {
        self.set_session(session_id, payload);
        self
    }

    pub fn set_session(&self, session_id: impl Into<String>, payload: SessionPayload) {
        lock_unpoisoned(&self.state)
            .sessions
            .insert(session_id.into(), payload);
    }

    pub fn set_summaries(&self, persisted: Vec<SessionSummary>, core: Vec<SessionSummary>) {
        let mut state = lock_unpoisoned(&self.state);
        state.persisted = persisted;
        state.core = core;
    }

    pub fn set_running(&self, session_id: &str, running: bool) {
        let mut state = lock_unpoisoned(&self.state);
        if running {
            state.running_jobs.insert(session_id.to_string());
        } else {
            state.running_jobs.remove(session_id);
        }
    }

    /// Makes every later fetch of `session_id` fail with HTTP 500.
    pub fn fail_session(&self, session_id: &str) {
        lock_unpoisoned(&self.state)
            .failing_sessions
            .insert(session_id.to_string());
    }

    pub fn fail_lists(&self, persisted: bool, core: bool) {
        let mut state = lock_unpoisoned(&self.state);
        state.failing_persisted_list = persisted;
        state.failing_core_list = core;
    }

    /// Holds every later fetch of `session_id` until [`Self::release_session`]
    /// lets it through, one fetch per release.
    pub fn gate_session(&self, session_id: &str) {
        lock_unpoisoned(&self.gates).insert(session_id.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release_session(&self, session_id: &str) {
        if let Some(gate) = lock_unpoisoned(&self.gates).get(session_id) {
            gate.add_permits(1);
        }
    }

    /// Holds every later job-status call for `session_id` until
    /// [`Self::release_status`], one call per release. The call is recorded
    /// before it waits.
    pub fn gate_status(&self, session_id: &str) {
        lock_unpoisoned(&self.status_gates)
            .insert(session_id.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release_status(&self, session_id: &str) {
        if let Some(gate) = lock_unpoisoned(&self.status_gates).get(session_id) {
            gate.add_permits(1);
        }
    }

    #[must_use]
    pub fn calls(&self) -> MockCalls {
        lock_unpoisoned(&self.state).calls.clone()
    }

    #[must_use]
    pub fn fetch_count(&self, session_id: &str) -> usize {
        lock_unpoisoned(&self.state)
            .calls
            .fetches
            .iter()
            .filter(|fetched| fetched.as_str() == session_id)
            .count()
    }

    fn gate_for(&self, session_id: &str) -> Option<Arc<Semaphore>> {
        lock_unpoisoned(&self.gates).get(session_id).cloned()
    }

    fn status_gate_for(&self, session_id: &str) -> Option<Arc<Semaphore>> {
        lock_unpoisoned(&self.status_gates).get(session_id).cloned()
    }
}

#[async_trait]
impl SessionBackend for MockSessionBackend {
    async fn fetch_session(&self, session_id: &str) -> Result<SessionPayload, BackendError> {
        lock_unpoisoned(&self.state)
            .calls
            .fetches
            .push(session_id.to_string());

        if let Some(gate) = self.gate_for(session_id) {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| BackendError::Transport("mock gate closed".to_string()))?;
            permit.forget();
        }

        let state = lock_unpoisoned(&self.state);
        if state.failing_sessions.contains(session_id) {
            return Err(BackendError::status(500, "Failed to fetch session"));
        }
        state
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found(session_id))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, BackendError> {
        let mut state = lock_unpoisoned(&self.state);
        state.calls.list_calls += 1;
        if state.failing_persisted_list {
            return Err(BackendError::status(500, "Failed to fetch sessions"));
        }
        Ok(state.persisted.clone())
    }

    async fn list_core_sessions(&self) -> Result<Vec<SessionSummary>, BackendError> {
        let mut state = lock_unpoisoned(&self.state);
        state.calls.core_list_calls += 1;
        if state.failing_core_list {
            return Err(BackendError::status(500, "Failed to fetch core sessions"));
        }
        Ok(state.core.clone())
    }

    async fn job_status(&self, session_id: &str) -> Result<JobStatus, BackendError> {
        lock_unpoisoned(&self.state)
            .calls
            .status_checks
            .push(session_id.to_string());

        if let Some(gate) = self.status_gate_for(session_id) {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| BackendError::Transport("mock gate closed".to_string()))?;
            permit.forget();
        }

        Ok(JobStatus {
            has_running_jobs: lock_unpoisoned(&self.state)
                .running_jobs
                .contains(session_id),
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), BackendError> {
        let mut state = lock_unpoisoned(&self.state);
        state.calls.deletes.push(session_id.to_string());
        state.sessions.remove(session_id);
        state.persisted.retain(|summary| summary.id != session_id);
        state.core.retain(|summary| summary.id != session_id);
        Ok(())
    }
}

/// One call observed by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedMessage {
    pub text: String,
    pub options: SendOptions,
}

/// Dispatcher that records every send and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<DispatchedMessage>>,
    failure: Mutex<Option<String>>,
}

impl RecordingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next send fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *lock_unpoisoned(&self.failure) = Some(message.into());
    }

    #[must_use]
    pub fn sent(&self) -> Vec<DispatchedMessage> {
        lock_unpoisoned(&self.sent).clone()
    }
}

#[async_trait]
impl MessageDispatcher for RecordingDispatcher {
    async fn send_message(&self, text: String, options: SendOptions) -> Result<(), DispatchError> {
        lock_unpoisoned(&self.sent).push(DispatchedMessage { text, options });
        match lock_unpoisoned(&self.failure).take() {
            Some(message) => Err(DispatchError::new(message)),
            None => Ok(()),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
