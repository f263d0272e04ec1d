use session_backend::{BackendError, DispatchError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BranchError {
    #[error("failed to hydrate session '{session_id}': {source}")]
    Hydration {
        session_id: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to check job status for session '{session_id}': {source}")]
    JobStatus {
        session_id: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to list sessions (persisted: {persisted}; core: {core})")]
    SessionList {
        persisted: BackendError,
        core: BackendError,
    },

    #[error("failed to delete session '{session_id}': {source}")]
    DeleteSession {
        session_id: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to dispatch queued message '{temp_id}': {source}")]
    Dispatch {
        temp_id: String,
        #[source]
        source: DispatchError,
    },
}

impl BranchError {
    #[must_use]
    pub fn hydration(session_id: impl Into<String>, source: BackendError) -> Self {
        Self::Hydration {
            session_id: session_id.into(),
            source,
        }
    }

    #[must_use]
    pub fn job_status(session_id: impl Into<String>, source: BackendError) -> Self {
        Self::JobStatus {
            session_id: session_id.into(),
            source,
        }
    }

    #[must_use]
    pub fn delete_session(session_id: impl Into<String>, source: BackendError) -> Self {
        Self::DeleteSession {
            session_id: session_id.into(),
            source,
        }
    }

    #[must_use]
    pub fn dispatch(temp_id: impl Into<String>, source: DispatchError) -> Self {
        Self::Dispatch {
            temp_id: temp_id.into(),
            source,
        }
    }

    /// Session the failed operation was addressed to, when there is one.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Hydration { session_id, .. }
            | Self::JobStatus { session_id, .. }
            | Self::DeleteSession { session_id, .. } => Some(session_id),
            Self::SessionList { .. } | Self::Dispatch { .. } => None,
        }
    }
}
