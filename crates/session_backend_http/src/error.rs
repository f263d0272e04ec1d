use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Error as JsonError, Value};
use session_backend::BackendError;

#[derive(Debug)]
pub enum HttpBackendError {
    InvalidBaseUrl(String),
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<Value>,
}

impl fmt::Display for HttpBackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
        }
    }
}

impl std::error::Error for HttpBackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpBackendError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for HttpBackendError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

impl From<HttpBackendError> for BackendError {
    fn from(error: HttpBackendError) -> Self {
        match error {
            HttpBackendError::Status(status, message) => {
                BackendError::status(status.as_u16(), message)
            }
            HttpBackendError::Serde(error) => BackendError::Decode(error.to_string()),
            other => BackendError::Transport(other.to_string()),
        }
    }
}

/// Extract a human-readable message from an error response body.
///
/// Understands `{"error": "..."}` and `{"error": {"message": "..."}}`, falls
/// back to the raw body, then to the status reason phrase.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        let message = match payload.error {
            Some(Value::String(message)) => Some(message),
            Some(Value::Object(fields)) => fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        };
        if let Some(message) = message.filter(|message| !message.trim().is_empty()) {
            return message;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
