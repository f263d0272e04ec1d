//! Branching conversation manager.
//!
//! Rebuilds a conversation tree from a session's flat message log, keeps one
//! head (the active branch) through it, and queues outgoing turns so input
//! typed while a response streams is dispatched in order, even across
//! session switches.
//!
//! # Public API Overview
//! - [`ConversationTree`] holds the [`MessageStore`] and head, with
//!   `append`/`update`/`prune`/`checkout` and [`ConversationTree::linearize`].
//! - [`build_tree`] hydrates a tree from backend records.
//! - [`ChatController`] wires the tree to a [`SessionBackend`] and a
//!   [`MessageDispatcher`]: session switching, the pending queue, and the
//!   job-status check driven by [`VisibilityPoller`].

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod tree;

pub use crate::config::ChatTreeConfig;
pub use crate::error::BranchError;
pub use crate::logging::init_tracing;
pub use crate::runtime::controller::{ChatController, ChatState, ProcessOutcome, SwitchOutcome};
pub use crate::runtime::poller::{BackgroundCheck, Visibility, VisibilityPoller};
pub use crate::runtime::queue::{PendingMessage, PendingQueue};
pub use crate::runtime::session::{
    merge_session_lists, session_sort_key, HydrationTicket, SessionBinder, SessionPatch,
};
pub use crate::tree::hydrate::{build_tree, HydratedTree, HydrationMode};
pub use crate::tree::linearize::{linearize, LinearPath, PathEnd, MAX_ANCESTOR_HOPS};
pub use crate::tree::message::{Message, MessagePatch, Role};
pub use crate::tree::store::MessageStore;
pub use crate::tree::ConversationTree;

pub use session_backend::{
    BackendError, DispatchError, ImageAttachment, JobStatus, MessageDispatcher, RawMessageRecord,
    SendOptions, SessionBackend, SessionPayload, SessionSummary,
};
