//! The conversation tree: a flat store plus a single head pointer.
//!
//! Every head change goes through `set_head`, which writes the plain field
//! read by in-flight async work and publishes the same value on a watch
//! channel for observers.

pub mod hydrate;
pub mod linearize;
pub mod message;
pub mod store;

use std::collections::HashSet;

use tokio::sync::watch;
use uuid::Uuid;

use crate::tree::linearize::{linearize, LinearPath, MAX_ANCESTOR_HOPS};
use crate::tree::message::{Message, MessagePatch};
use crate::tree::store::MessageStore;

pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Debug)]
pub struct ConversationTree {
    store: MessageStore,
    head: Option<String>,
    head_tx: watch::Sender<Option<String>>,
}

impl Default for ConversationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationTree {
    #[must_use]
    pub fn new() -> Self {
        let (head_tx, _) = watch::channel(None);
        Self {
            store: MessageStore::new(),
            head: None,
            head_tx,
        }
    }

    #[must_use]
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    #[must_use]
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// Receiver that observes every head change from now on.
    #[must_use]
    pub fn subscribe_head(&self) -> watch::Receiver<Option<String>> {
        self.head_tx.subscribe()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.store.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Inserts `message` under `parent_id` and moves the head to it.
    ///
    /// A blank `message.id` is replaced with a fresh `temp-` id. A parent
    /// that is unknown, or that lies in the subtree of the id being written,
    /// is dropped and the message becomes a root. Returns the stored id.
    pub fn append(&mut self, mut message: Message, parent_id: Option<&str>) -> String {
        let id = if message.id.trim().is_empty() {
            format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
        } else {
            message.id.clone()
        };

        message.parent_id = parent_id
            .filter(|parent| self.store.contains(parent))
            .filter(|parent| !self.descends_from(parent, &id))
            .map(str::to_string);
        message.id = id.clone();

        self.store.insert(message);
        self.set_head(Some(id.clone()));
        id
    }

    /// Merges `patch` into the message in place. Parent and head are left
    /// alone. Returns whether the message existed.
    pub fn update(&mut self, id: &str, patch: MessagePatch) -> bool {
        match self.store.get_mut(id) {
            Some(message) => {
                message.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Moves an existing message under `parent_id` without touching the
    /// head. The same parent rules as [`Self::append`] apply. Returns whether
    /// the message existed.
    pub fn reparent(&mut self, id: &str, parent_id: Option<&str>) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        let parent_id = parent_id
            .filter(|parent| self.store.contains(parent))
            .filter(|parent| !self.descends_from(parent, id))
            .map(str::to_string);
        if let Some(message) = self.store.get_mut(id) {
            message.parent_id = parent_id;
        }
        true
    }

    /// Appends streamed text to a message's content.
    pub fn append_content(&mut self, id: &str, delta: &str) -> bool {
        match self.store.get_mut(id) {
            Some(message) => {
                message.content.push_str(delta);
                true
            }
            None => false,
        }
    }

    /// Removes `root_id` and all of its descendants, then moves the head to
    /// the removed root's parent. Returns the removed ids; an unknown id is a
    /// no-op.
    pub fn prune(&mut self, root_id: &str) -> Vec<String> {
        if !self.store.contains(root_id) {
            return Vec::new();
        }

        let former_parent = self.store.resolved_parent(root_id).map(str::to_string);
        let removed = {
            let children = self.store.child_index();
            let mut removed = Vec::new();
            let mut seen = HashSet::new();
            let mut stack = vec![root_id];
            while let Some(current) = stack.pop() {
                if !seen.insert(current) {
                    continue;
                }
                removed.push(current.to_string());
                if let Some(kids) = children.get(current) {
                    stack.extend(kids.iter().copied());
                }
            }
            removed
        };

        for id in &removed {
            self.store.remove(id);
        }
        self.set_head(former_parent);
        removed
    }

    /// Moves the head to an existing message.
    pub fn checkout(&mut self, id: &str) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        self.set_head(Some(id.to_string()));
        true
    }

    /// Sibling branches directly under `id`, in id order.
    #[must_use]
    pub fn children(&self, id: &str) -> Vec<&Message> {
        self.store.children_of(id)
    }

    /// The displayed root → head path.
    #[must_use]
    pub fn linearize(&self) -> LinearPath {
        linearize(self.head.as_deref(), &self.store)
    }

    /// Swaps in a freshly hydrated store and head.
    pub fn replace(&mut self, store: MessageStore, head: Option<String>) {
        self.store = store;
        self.set_head(head);
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.set_head(None);
    }

    fn set_head(&mut self, head: Option<String>) {
        self.head = head.clone();
        self.head_tx.send_replace(head);
    }

    /// True when walking parents up from `candidate` reaches `ancestor`.
    fn descends_from(&self, candidate: &str, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut cursor = Some(candidate);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            if seen.len() >= MAX_ANCESTOR_HOPS || !seen.insert(id) {
                return false;
            }
            cursor = self
                .store
                .get(id)
                .and_then(|message| message.parent_id.as_deref());
        }
        false
    }
}
