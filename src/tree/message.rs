use serde::{Deserialize, Serialize};
use serde_json::Value;
use session_backend::ImageAttachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// `"user"` maps to [`Role::User`]; every other value is a model turn.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        if value == "user" {
            Self::User
        } else {
            Self::Model
        }
    }
}

/// One node of the conversation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub queued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
}

impl Message {
    /// A message without an id; [`crate::ConversationTree::append`] mints one.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            role,
            content: content.into(),
            parent_id: None,
            stats: None,
            thought: None,
            citations: Vec::new(),
            images: Vec::new(),
            session_id: None,
            error: false,
            queued: false,
            temp_id: None,
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    /// Marks the message as a queue placeholder whose id is also its temp id.
    #[must_use]
    pub fn queued_placeholder(mut self, temp_id: impl Into<String>) -> Self {
        let temp_id = temp_id.into();
        self.id = temp_id.clone();
        self.temp_id = Some(temp_id);
        self.queued = true;
        self
    }

    pub fn apply(&mut self, patch: MessagePatch) {
        let MessagePatch {
            content,
            stats,
            thought,
            citations,
            images,
            error,
            queued,
        } = patch;

        if let Some(content) = content {
            self.content = content;
        }
        if let Some(stats) = stats {
            self.stats = Some(stats);
        }
        if let Some(thought) = thought {
            self.thought = Some(thought);
        }
        if let Some(citations) = citations {
            self.citations = citations;
        }
        if let Some(images) = images {
            self.images = images;
        }
        if let Some(error) = error {
            self.error = error;
        }
        if let Some(queued) = queued {
            self.queued = queued;
        }
    }
}

/// Partial in-place update. Never carries `id` or `parentId`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub stats: Option<Value>,
    pub thought: Option<String>,
    pub citations: Option<Vec<String>>,
    pub images: Option<Vec<ImageAttachment>>,
    pub error: Option<bool>,
    pub queued: Option<bool>,
}

impl MessagePatch {
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_stats(mut self, stats: Value) -> Self {
        self.stats = Some(stats);
        self
    }

    #[must_use]
    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    #[must_use]
    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        self.citations = Some(citations);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: bool) -> Self {
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn with_queued(mut self, queued: bool) -> Self {
        self.queued = Some(queued);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
