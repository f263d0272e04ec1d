//! Backend-neutral contract between the conversation branch manager and the
//! session service it hydrates from.
//!
//! This crate defines only the wire shapes the backend owns (message records,
//! session summaries, job status) and the two async seams the core calls
//! through: [`SessionBackend`] for reads/deletes and [`MessageDispatcher`] for
//! handing a user turn to whatever sends and streams it. Transport and
//! persistence details live elsewhere.

mod error;
mod record;
mod summary;

use async_trait::async_trait;

pub use error::{BackendError, DispatchError};
pub use record::{ImageAttachment, JobStatus, RawMessageRecord, SessionPayload};
pub use summary::SessionSummary;

/// Options passed alongside the text of a dispatched user turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub parent_id: Option<String>,
    pub images: Option<Vec<ImageAttachment>>,
    /// Id of the optimistic placeholder the dispatcher should reuse instead of
    /// minting a new user message.
    pub reuse_message_id: Option<String>,
    pub session_id: Option<String>,
}

/// Read/delete access to the backend session store.
#[async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    /// Fetches one session's flat message log.
    async fn fetch_session(&self, session_id: &str) -> Result<SessionPayload, BackendError>;

    /// Lists sessions from the persisted source.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, BackendError>;

    /// Lists ephemeral sessions known only to the core runner.
    ///
    /// Backends without a core source report none.
    async fn list_core_sessions(&self) -> Result<Vec<SessionSummary>, BackendError> {
        Ok(Vec::new())
    }

    /// Reports whether a job is still running server-side for the session.
    async fn job_status(&self, session_id: &str) -> Result<JobStatus, BackendError>;

    /// Deletes a session and its messages.
    async fn delete_session(&self, _session_id: &str) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("session deletion"))
    }
}

/// Sends a user turn and drives the response stream for it.
#[async_trait]
pub trait MessageDispatcher: Send + Sync + 'static {
    async fn send_message(&self, text: String, options: SendOptions) -> Result<(), DispatchError>;
}
