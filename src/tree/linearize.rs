use std::collections::HashSet;

use tracing::debug;

use crate::tree::message::Message;
use crate::tree::store::MessageStore;

/// Upper bound on nodes collected by one ancestor walk.
pub const MAX_ANCESTOR_HOPS: usize = 2000;

/// Why an ancestor walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEnd {
    /// Reached a node without a parent, or there was no head.
    Root,
    /// A parent id (or the head itself) was not in the store.
    MissingAncestor,
    /// A parent id repeated an id already on the path.
    Cycle,
    /// [`MAX_ANCESTOR_HOPS`] nodes were collected before reaching a root.
    DepthCap,
}

/// Root → head path through a [`MessageStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPath {
    pub messages: Vec<Message>,
    pub end: PathEnd,
}

impl LinearPath {
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.messages
            .iter()
            .map(|message| message.id.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True when the walk stopped early instead of reaching a root.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(self.end, PathEnd::Cycle | PathEnd::DepthCap)
    }
}

/// Walks parent links upward from `head` and returns the path root-first.
///
/// A dangling parent ends the walk like a root would; it is reported as
/// [`PathEnd::MissingAncestor`] but is not an error.
pub fn linearize<'a>(head: Option<&'a str>, store: &'a MessageStore) -> LinearPath {
    let mut chain: Vec<&Message> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cursor = head;

    let end = loop {
        let Some(id) = cursor else {
            break PathEnd::Root;
        };
        if chain.len() >= MAX_ANCESTOR_HOPS {
            debug!(head = ?head, at = id, "ancestor walk hit depth cap; path truncated");
            break PathEnd::DepthCap;
        }
        if !seen.insert(id) {
            debug!(head = ?head, at = id, "ancestor walk revisited a node; path truncated");
            break PathEnd::Cycle;
        }
        let Some(message) = store.get(id) else {
            break PathEnd::MissingAncestor;
        };
        chain.push(message);
        cursor = message.parent_id.as_deref();
    };

    LinearPath {
        messages: chain.into_iter().rev().cloned().collect(),
        end,
    }
}
