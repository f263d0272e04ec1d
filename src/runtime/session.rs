//! Active session bookkeeping and the merged session list.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde_json::Value;
use session_backend::{SessionPayload, SessionSummary};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Identifies one hydration attempt. A result is applied only while its
/// ticket's generation is still the binder's current generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationTicket {
    pub session_id: String,
    pub generation: u64,
}

/// Local edits to a cached session summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub updated_at: Option<Value>,
    pub workspace: Option<String>,
}

impl SessionPatch {
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_updated_at(mut self, updated_at: impl Into<Value>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct SessionBinder {
    current_session_id: Option<String>,
    current_workspace: Option<String>,
    sessions: Vec<SessionSummary>,
    generation: u64,
    loading: bool,
}

impl SessionBinder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    #[must_use]
    pub fn current_workspace(&self) -> Option<&str> {
        self.current_workspace.as_deref()
    }

    #[must_use]
    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    #[must_use]
    pub fn summary(&self, session_id: &str) -> Option<&SessionSummary> {
        self.sessions.iter().find(|summary| summary.id == session_id)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a switch to `session_id`, invalidating every earlier ticket.
    pub fn begin_switch(&mut self, session_id: &str) -> HydrationTicket {
        self.generation += 1;
        self.loading = true;
        HydrationTicket {
            session_id: session_id.to_string(),
            generation: self.generation,
        }
    }

    /// Ticket for re-hydrating the current session. `None` while a switch is
    /// in flight, so a refresh never races the session being switched to.
    #[must_use]
    pub fn current_ticket(&self) -> Option<HydrationTicket> {
        if self.loading {
            return None;
        }
        self.current_session_id
            .as_ref()
            .map(|session_id| HydrationTicket {
                session_id: session_id.clone(),
                generation: self.generation,
            })
    }

    #[must_use]
    pub fn is_current(&self, ticket: &HydrationTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Makes the ticket's session current. Returns `false` for a stale
    /// ticket, leaving the binder untouched.
    pub fn commit(&mut self, ticket: &HydrationTicket, payload: &SessionPayload) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let workspace = self.workspace_for(&ticket.session_id, payload);
        self.current_session_id = Some(ticket.session_id.clone());
        self.current_workspace = workspace;
        self.loading = false;
        true
    }

    /// Ends a failed switch. The previous session stays current.
    pub fn abort(&mut self, ticket: &HydrationTicket) {
        if self.is_current(ticket) {
            self.loading = false;
        }
    }

    /// Workspace of the cached summary when the session is listed, else the
    /// one on the fetched session row.
    #[must_use]
    pub fn workspace_for(&self, session_id: &str, payload: &SessionPayload) -> Option<String> {
        match self.summary(session_id) {
            Some(summary) => summary.workspace.clone().filter(|ws| !ws.trim().is_empty()),
            None => payload.workspace(),
        }
    }

    /// Detaches from any session. Pending switches become stale.
    pub fn start_new_chat(&mut self, workspace: Option<String>) {
        self.generation += 1;
        self.loading = false;
        self.current_session_id = None;
        self.current_workspace = workspace;
    }

    pub fn set_sessions(&mut self, sessions: Vec<SessionSummary>) {
        self.sessions = sessions;
    }

    pub fn remove_session(&mut self, session_id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|summary| summary.id != session_id);
        self.sessions.len() != before
    }

    /// Applies a local edit to a cached summary and re-sorts the list.
    pub fn update_session(&mut self, session_id: &str, patch: SessionPatch) -> bool {
        let Some(summary) = self
            .sessions
            .iter_mut()
            .find(|summary| summary.id == session_id)
        else {
            return false;
        };

        if let Some(title) = patch.title {
            summary.title = Some(title);
        }
        if let Some(updated_at) = patch.updated_at {
            summary.updated_at = Some(updated_at);
        }
        if let Some(workspace) = patch.workspace {
            summary.workspace = Some(workspace);
        }
        sort_sessions(&mut self.sessions);
        true
    }
}

/// Merges both list sources: persisted entries win on id collisions and the
/// result is ordered most recently updated first.
#[must_use]
pub fn merge_session_lists(
    persisted: Vec<SessionSummary>,
    core: Vec<SessionSummary>,
) -> Vec<SessionSummary> {
    let mut seen = HashSet::new();
    let mut merged = persisted
        .into_iter()
        .chain(core)
        .filter(|summary| seen.insert(summary.id.clone()))
        .collect::<Vec<_>>();
    sort_sessions(&mut merged);
    merged
}

fn sort_sessions(sessions: &mut [SessionSummary]) {
    sessions.sort_by_key(|summary| Reverse(session_sort_key(summary)));
}

/// Milliseconds since the epoch of `updated_at`, falling back to
/// `last_updated`. Unparsable or missing timestamps sort as `0`.
#[must_use]
pub fn session_sort_key(summary: &SessionSummary) -> i64 {
    summary
        .updated_at
        .as_ref()
        .filter(|value| is_present(value))
        .and_then(timestamp_millis)
        .or_else(|| {
            summary
                .last_updated
                .as_deref()
                .filter(|value| !value.is_empty())
                .and_then(parse_timestamp)
        })
        .unwrap_or(0)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|millis| millis != 0.0),
        _ => true,
    }
}

fn timestamp_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|millis| millis as i64)),
        Value::String(text) => parse_timestamp(text),
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(parsed) = OffsetDateTime::parse(text, &Rfc3339) {
        return i64::try_from(parsed.unix_timestamp_nanos() / 1_000_000).ok();
    }
    text.parse::<i64>().ok()
}
