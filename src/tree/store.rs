use std::collections::HashMap;

use crate::tree::message::Message;

/// Flat id → message map backing one conversation tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStore {
    messages: HashMap<String, Message>,
}

impl MessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.messages.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.get_mut(id)
    }

    /// Inserts under `message.id`, returning the message it replaced.
    pub fn insert(&mut self, message: Message) -> Option<Message> {
        self.messages.insert(message.id.clone(), message)
    }

    pub fn remove(&mut self, id: &str) -> Option<Message> {
        self.messages.remove(id)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = self.messages.keys().map(String::as_str).collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    /// Parent id of `id` when it resolves to a stored message.
    ///
    /// Dangling parent references read as `None`, matching how they are
    /// treated everywhere else: the child is a root.
    #[must_use]
    pub fn resolved_parent(&self, id: &str) -> Option<&str> {
        self.get(id)
            .and_then(|message| message.parent_id.as_deref())
            .filter(|parent_id| self.contains(parent_id))
    }

    /// Direct children of `parent_id`, in id order.
    #[must_use]
    pub fn children_of(&self, parent_id: &str) -> Vec<&Message> {
        let mut children = self
            .messages
            .values()
            .filter(|message| message.parent_id.as_deref() == Some(parent_id))
            .collect::<Vec<_>>();
        children.sort_unstable_by(|left, right| left.id.cmp(&right.id));
        children
    }

    /// Parent → children index over the whole store.
    pub(crate) fn child_index(&self) -> HashMap<&str, Vec<&str>> {
        let mut index: HashMap<&str, Vec<&str>> = HashMap::new();
        for message in self.messages.values() {
            if let Some(parent_id) = message.parent_id.as_deref() {
                index.entry(parent_id).or_default().push(message.id.as_str());
            }
        }
        index
    }
}

impl FromIterator<Message> for MessageStore {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut store = Self::new();
        for message in iter {
            store.insert(message);
        }
        store
    }
}
