use std::collections::VecDeque;

use session_backend::ImageAttachment;
use tracing::debug;
use uuid::Uuid;

use crate::tree::message::Message;
use crate::tree::store::MessageStore;
use crate::tree::ConversationTree;

pub const QUEUED_ID_PREFIX: &str = "queued-";

/// An outgoing user turn that has not been dispatched yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub content: String,
    pub images: Vec<ImageAttachment>,
    /// Id of the placeholder in the tree; reused by the dispatcher.
    pub temp_id: String,
    /// Previous queued item of the same session, else the head at enqueue
    /// time.
    pub parent_id: Option<String>,
    pub session_id: String,
}

impl PendingMessage {
    /// The queued user bubble shown until the item is dispatched.
    #[must_use]
    pub fn placeholder(&self) -> Message {
        Message::user(self.content.clone())
            .with_session(self.session_id.clone())
            .with_images(self.images.clone())
            .queued_placeholder(self.temp_id.clone())
    }
}

/// FIFO of pending turns, possibly spanning several sessions.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<PendingMessage>,
}

impl PendingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMessage> {
        self.items.iter()
    }

    #[must_use]
    pub fn front(&self) -> Option<&PendingMessage> {
        self.items.front()
    }

    pub fn for_session<'a>(
        &'a self,
        session_id: &'a str,
    ) -> impl Iterator<Item = &'a PendingMessage> + 'a {
        self.items
            .iter()
            .filter(move |item| item.session_id == session_id)
    }

    /// Queues a turn for `session_id` and appends its placeholder to `tree`.
    ///
    /// Returns the placeholder's temp id, or `None` when no session is active.
    pub fn enqueue(
        &mut self,
        tree: &mut ConversationTree,
        session_id: Option<&str>,
        content: impl Into<String>,
        images: Vec<ImageAttachment>,
    ) -> Option<String> {
        let Some(session_id) = session_id else {
            debug!("ignoring enqueue without an active session");
            return None;
        };

        let parent_id = self
            .for_session(session_id)
            .last()
            .map(|previous| previous.temp_id.clone())
            .or_else(|| tree.head().map(str::to_string));

        let item = PendingMessage {
            content: content.into(),
            images,
            temp_id: format!("{QUEUED_ID_PREFIX}{}", Uuid::new_v4()),
            parent_id,
            session_id: session_id.to_string(),
        };

        tree.append(item.placeholder(), item.parent_id.as_deref());
        let temp_id = item.temp_id.clone();
        debug!(%temp_id, session_id, parent_id = ?item.parent_id, "queued message");
        self.items.push_back(item);
        Some(temp_id)
    }

    pub fn pop_front(&mut self) -> Option<PendingMessage> {
        self.items.pop_front()
    }

    /// Drops every pending item of `session_id`, returning them in order.
    pub fn remove_session(&mut self, session_id: &str) -> Vec<PendingMessage> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| item.session_id == session_id);
        self.items = kept.into();
        removed
    }

    /// Puts an item back at the head of the queue after a deferred attempt.
    pub fn requeue_front(&mut self, item: PendingMessage) {
        self.items.push_front(item);
    }

    /// Re-inserts placeholders for `session_id` that a freshly fetched store
    /// does not know yet.
    ///
    /// Each placeholder keeps its recorded parent when that id is present
    /// (earlier placeholders included), else it hangs off `head`. The head
    /// itself is not moved. Returns how many placeholders were inserted.
    pub fn merge_placeholders(
        &self,
        session_id: &str,
        store: &mut MessageStore,
        head: Option<&str>,
    ) -> usize {
        let mut inserted = 0;
        for item in self.for_session(session_id) {
            if store.contains(&item.temp_id) {
                continue;
            }
            let parent_id = item
                .parent_id
                .as_deref()
                .filter(|parent| store.contains(parent))
                .or(head)
                .map(str::to_string);

            let mut placeholder = item.placeholder();
            placeholder.parent_id = parent_id;
            store.insert(placeholder);
            inserted += 1;
        }
        inserted
    }
}
