use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Image attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    #[serde(rename = "dataUrl")]
    pub data_url: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub name: String,
}

impl ImageAttachment {
    #[must_use]
    pub fn new(
        data_url: impl Into<String>,
        mime_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            data_url: data_url.into(),
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }
}

/// One message row as the backend returns it.
///
/// Every field is kept as raw JSON so that a wrong type on one record never
/// fails the whole payload. Field presence is preserved: a key sent as `null`
/// decodes to `Some(Value::Null)`, a missing key decodes to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessageRecord {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(
        rename = "parentId",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Value>,
    #[serde(
        rename = "parent_id",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id_alias: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub thought: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub citations: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub images: Option<Value>,
    #[serde(
        rename = "sessionId",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl RawMessageRecord {
    /// Builds a record with an id, role and text content and no parent field.
    #[must_use]
    pub fn new(id: impl Into<String>, role: &str, content: impl Into<String>) -> Self {
        Self {
            id: Some(Value::String(id.into())),
            role: Some(Value::String(role.to_string())),
            content: Some(Value::String(content.into())),
            ..Self::default()
        }
    }

    /// Sets an explicit `parentId` field; `None` is sent as JSON `null`.
    #[must_use]
    pub fn with_parent(mut self, parent_id: Option<&str>) -> Self {
        self.parent_id = Some(
            parent_id
                .map(|value| Value::String(value.to_string()))
                .unwrap_or(Value::Null),
        );
        self
    }

    /// Decodes a record from an arbitrary JSON value. Non-objects decode to a
    /// record with every field missing.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            serde_json::from_value(value).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// True when either parent key is present, even with a `null` value.
    #[must_use]
    pub fn has_parent_field(&self) -> bool {
        self.parent_id.is_some() || self.parent_id_alias.is_some()
    }

    /// Returns the non-null parent reference, preferring `parentId` over the
    /// snake_case alias.
    #[must_use]
    pub fn parent_candidate(&self) -> Option<&Value> {
        self.parent_id
            .as_ref()
            .filter(|value| !value.is_null())
            .or_else(|| self.parent_id_alias.as_ref().filter(|value| !value.is_null()))
    }
}

/// Body of `GET /api/sessions/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(default, deserialize_with = "lenient_records")]
    pub messages: Vec<RawMessageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Value>,
}

impl SessionPayload {
    #[must_use]
    pub fn new(messages: Vec<RawMessageRecord>) -> Self {
        Self {
            messages,
            session: None,
        }
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.session = Some(serde_json::json!({ "workspace": workspace.into() }));
        self
    }

    /// Workspace recorded on the session row, when it is a non-empty string.
    #[must_use]
    pub fn workspace(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|session| session.get("workspace"))
            .and_then(Value::as_str)
            .filter(|workspace| !workspace.trim().is_empty())
            .map(str::to_string)
    }
}

/// Body of `GET /api/chat/status?sessionId=...`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(rename = "hasRunningJobs", default)]
    pub has_running_jobs: bool,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<RawMessageRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().map(RawMessageRecord::from_value).collect(),
        _ => Vec::new(),
    })
}
