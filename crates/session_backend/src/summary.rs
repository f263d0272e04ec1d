use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the session list endpoints.
///
/// Timestamps are left as raw JSON because the persisted and core sources
/// disagree on their representation (RFC 3339 strings vs epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(rename = "isCore", default)]
    pub is_core: bool,
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl SessionSummary {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            created_at: None,
            updated_at: None,
            workspace: None,
            is_core: false,
            last_updated: None,
        }
    }

    #[must_use]
    pub fn with_updated_at(mut self, updated_at: impl Into<Value>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    #[must_use]
    pub fn core(mut self) -> Self {
        self.is_core = true;
        self
    }
}
