use std::fmt;

use thiserror::Error;

/// Failure talking to the session backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("session '{session_id}' was not found")]
    NotFound { session_id: String },

    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

impl BackendError {
    #[must_use]
    pub fn not_found(session_id: impl Into<String>) -> Self {
        Self::NotFound {
            session_id: session_id.into(),
        }
    }

    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// Error returned by the external send-message collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    message: String,
}

impl DispatchError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DispatchError {}

impl From<String> for DispatchError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for DispatchError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
