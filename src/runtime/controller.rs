//! Single-writer front door over the tree, queue, and session binder.
//!
//! All state lives behind one `std::sync::Mutex` that is never held across an
//! `.await`. Backend calls run unlocked; their results are applied under the
//! lock only after the hydration ticket is checked.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use session_backend::{
    ImageAttachment, MessageDispatcher, SendOptions, SessionBackend, SessionSummary,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::BranchError;
use crate::runtime::poller::{BackgroundCheck, VisibilityPoller};
use crate::runtime::queue::{PendingMessage, PendingQueue};
use crate::runtime::session::{merge_session_lists, HydrationTicket, SessionBinder, SessionPatch};
use crate::tree::hydrate::{build_tree, HydratedTree};
use crate::tree::linearize::LinearPath;
use crate::tree::message::{Message, MessagePatch};
use crate::tree::ConversationTree;

#[derive(Debug, Default)]
pub struct ChatState {
    pub tree: ConversationTree,
    pub queue: PendingQueue,
    pub binder: SessionBinder,
    processing: bool,
}

impl ChatState {
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The requested session was already current; nothing was fetched.
    AlreadyCurrent,
    /// The session was hydrated and is now current.
    Switched { head: Option<String> },
    /// A newer switch or new chat superseded this one; the result was
    /// discarded.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Nothing queued.
    Idle,
    /// Another item is already being processed.
    Busy,
    /// The item's session switch was superseded; it is back at the front.
    Deferred,
    Dispatched {
        temp_id: String,
        parent_id: Option<String>,
        session_id: String,
    },
}

#[derive(Clone)]
pub struct ChatController {
    state: Arc<Mutex<ChatState>>,
    backend: Arc<dyn SessionBackend>,
    dispatcher: Arc<dyn MessageDispatcher>,
}

impl ChatController {
    pub fn new(backend: Arc<dyn SessionBackend>, dispatcher: Arc<dyn MessageDispatcher>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChatState::default())),
            backend,
            dispatcher,
        }
    }

    /// Runs `f` with shared access to the whole state.
    pub fn with_state<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        f(&self.lock())
    }

    #[must_use]
    pub fn head(&self) -> Option<String> {
        self.lock().tree.head().map(str::to_string)
    }

    #[must_use]
    pub fn subscribe_head(&self) -> watch::Receiver<Option<String>> {
        self.lock().tree.subscribe_head()
    }

    /// The displayed root → head path.
    #[must_use]
    pub fn path(&self) -> LinearPath {
        self.lock().tree.linearize()
    }

    #[must_use]
    pub fn message(&self, id: &str) -> Option<Message> {
        self.lock().tree.get(id).cloned()
    }

    #[must_use]
    pub fn current_session_id(&self) -> Option<String> {
        self.lock().binder.current_session_id().map(str::to_string)
    }

    #[must_use]
    pub fn current_workspace(&self) -> Option<String> {
        self.lock().binder.current_workspace().map(str::to_string)
    }

    #[must_use]
    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.lock().binder.sessions().to_vec()
    }

    #[must_use]
    pub fn is_session_loading(&self) -> bool {
        self.lock().binder.is_loading()
    }

    #[must_use]
    pub fn pending(&self) -> Vec<PendingMessage> {
        self.lock().queue.iter().cloned().collect()
    }

    pub fn append(&self, message: Message, parent_id: Option<&str>) -> String {
        self.lock().tree.append(message, parent_id)
    }

    pub fn update(&self, id: &str, patch: MessagePatch) -> bool {
        self.lock().tree.update(id, patch)
    }

    pub fn append_content(&self, id: &str, delta: &str) -> bool {
        self.lock().tree.append_content(id, delta)
    }

    pub fn prune(&self, root_id: &str) -> Vec<String> {
        self.lock().tree.prune(root_id)
    }

    pub fn checkout(&self, id: &str) -> bool {
        self.lock().tree.checkout(id)
    }

    /// Queues a turn for the current session. `None` when no session is
    /// active.
    pub fn enqueue(&self, content: impl Into<String>, images: Vec<ImageAttachment>) -> Option<String> {
        let mut state = self.lock();
        let ChatState {
            tree,
            queue,
            binder,
            ..
        } = &mut *state;
        queue.enqueue(tree, binder.current_session_id(), content, images)
    }

    /// Dispatches the oldest queued turn, switching sessions first when the
    /// turn belongs to another one.
    pub async fn process_next(&self) -> Result<ProcessOutcome, BranchError> {
        let (item, needs_switch, _latch) = match self.claim_next() {
            Claim::Idle => return Ok(ProcessOutcome::Idle),
            Claim::Busy => return Ok(ProcessOutcome::Busy),
            Claim::Ready {
                item,
                needs_switch,
                latch,
            } => (item, needs_switch, latch),
        };

        if needs_switch {
            let ticket = self.lock().binder.begin_switch(&item.session_id);
            match self.hydrate(ticket).await {
                Ok(SwitchOutcome::Switched { .. }) => {}
                Ok(SwitchOutcome::Stale | SwitchOutcome::AlreadyCurrent) => {
                    debug!(temp_id = %item.temp_id, "queued session switch superseded; deferring");
                    self.lock().queue.requeue_front(item);
                    return Ok(ProcessOutcome::Deferred);
                }
                Err(error) => {
                    self.lock().queue.requeue_front(item);
                    return Err(error);
                }
            }
        }

        let Some(parent_id) = self.confirm_placeholder(&item) else {
            debug!(temp_id = %item.temp_id, "session changed before dispatch; deferring");
            self.lock().queue.requeue_front(item);
            return Ok(ProcessOutcome::Deferred);
        };

        let PendingMessage {
            content,
            images,
            temp_id,
            session_id,
            ..
        } = item;
        let options = SendOptions {
            parent_id: parent_id.clone(),
            images: (!images.is_empty()).then_some(images),
            reuse_message_id: Some(temp_id.clone()),
            session_id: Some(session_id.clone()),
        };

        if let Err(source) = self.dispatcher.send_message(content, options).await {
            warn!(%temp_id, error = %source, "dispatch of queued message failed");
            let mut state = self.lock();
            if state.binder.current_session_id() == Some(session_id.as_str()) {
                state
                    .tree
                    .update(&temp_id, MessagePatch::default().with_error(true));
            } else {
                debug!(%temp_id, %session_id, "session changed during dispatch; not flagging placeholder");
            }
            return Err(BranchError::dispatch(temp_id, source));
        }

        debug!(%temp_id, %session_id, parent_id = ?parent_id, "dispatched queued message");
        Ok(ProcessOutcome::Dispatched {
            temp_id,
            parent_id,
            session_id,
        })
    }

    /// Switches to `session_id`, hydrating it first. The switch commits only
    /// once hydration succeeds.
    pub async fn select_session(&self, session_id: &str) -> Result<SwitchOutcome, BranchError> {
        let ticket = {
            let mut state = self.lock();
            if state.binder.current_session_id() == Some(session_id) {
                return Ok(SwitchOutcome::AlreadyCurrent);
            }
            state.binder.begin_switch(session_id)
        };
        self.hydrate(ticket).await
    }

    /// Re-fetches the current session. Returns whether the result was applied.
    pub async fn rehydrate_current(&self) -> Result<bool, BranchError> {
        let Some(ticket) = self.lock().binder.current_ticket() else {
            return Ok(false);
        };
        Ok(matches!(
            self.hydrate(ticket).await?,
            SwitchOutcome::Switched { .. }
        ))
    }

    /// Detaches from the current session and clears the tree. The queue is
    /// kept.
    pub fn new_chat(&self) {
        self.reset(None);
    }

    /// Like [`Self::new_chat`] but binds the fresh chat to `workspace`.
    pub fn new_chat_in_workspace(&self, workspace: impl Into<String>) {
        self.reset(Some(workspace.into()));
    }

    /// Deletes a session on the backend, drops it from the list and from the
    /// queue, and resets to a new chat when it was current.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), BranchError> {
        self.backend
            .delete_session(session_id)
            .await
            .map_err(|source| BranchError::delete_session(session_id, source))?;

        let mut state = self.lock();
        state.binder.remove_session(session_id);
        let dropped = state.queue.remove_session(session_id);
        if !dropped.is_empty() {
            debug!(session_id, dropped = dropped.len(), "dropped queued messages of deleted session");
        }
        if state.binder.current_session_id() == Some(session_id) {
            state.binder.start_new_chat(None);
            state.tree.clear();
        }
        Ok(())
    }

    /// Reloads the merged session list. One failing source is logged and
    /// treated as empty; both failing is an error and keeps the old list.
    pub async fn refresh_sessions(&self) -> Result<usize, BranchError> {
        let (persisted, core) =
            tokio::join!(self.backend.list_sessions(), self.backend.list_core_sessions());

        let (persisted, core) = match (persisted, core) {
            (Err(persisted), Err(core)) => {
                return Err(BranchError::SessionList { persisted, core });
            }
            (persisted, core) => (
                persisted.unwrap_or_else(|error| {
                    warn!(%error, "persisted session list unavailable");
                    Vec::new()
                }),
                core.unwrap_or_else(|error| {
                    warn!(%error, "core session list unavailable");
                    Vec::new()
                }),
            ),
        };

        let merged = merge_session_lists(persisted, core);
        let count = merged.len();
        self.lock().binder.set_sessions(merged);
        Ok(count)
    }

    pub fn update_session(&self, session_id: &str, patch: SessionPatch) -> bool {
        self.lock().binder.update_session(session_id, patch)
    }

    /// Asks the backend whether a job is running for the current session and
    /// re-hydrates when one is.
    ///
    /// The ticket is taken before the status call, so a switch in between
    /// makes the re-hydration stale instead of refreshing the new session.
    pub async fn check_background_jobs(&self) -> Result<bool, BranchError> {
        let Some(ticket) = self.lock().binder.current_ticket() else {
            return Ok(false);
        };

        let status = self
            .backend
            .job_status(&ticket.session_id)
            .await
            .map_err(|source| BranchError::job_status(&ticket.session_id, source))?;
        if !status.has_running_jobs {
            return Ok(false);
        }

        debug!(session_id = %ticket.session_id, "background job running; re-hydrating");
        Ok(matches!(
            self.hydrate(ticket).await?,
            SwitchOutcome::Switched { .. }
        ))
    }

    /// A poller that runs [`Self::check_background_jobs`] while hidden.
    #[must_use]
    pub fn visibility_poller(&self, interval: Duration) -> VisibilityPoller<ChatController> {
        VisibilityPoller::new(Arc::new(self.clone()), interval)
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        lock_unpoisoned(&self.state)
    }

    fn reset(&self, workspace: Option<String>) {
        let mut state = self.lock();
        state.binder.start_new_chat(workspace);
        state.tree.clear();
    }

    /// Pops the next item and raises the processing latch.
    fn claim_next(&self) -> Claim {
        let mut state = self.lock();
        if state.processing {
            return Claim::Busy;
        }
        let Some(item) = state.queue.pop_front() else {
            return Claim::Idle;
        };
        state.processing = true;
        let needs_switch = state.binder.current_session_id() != Some(item.session_id.as_str());
        Claim::Ready {
            item,
            needs_switch,
            latch: ProcessingLatch {
                state: Arc::clone(&self.state),
            },
        }
    }

    /// Marks the placeholder as sent under the effective parent, re-adding
    /// it if hydration dropped it. Returns that parent, or `None` when the
    /// item's session is no longer current.
    fn confirm_placeholder(&self, item: &PendingMessage) -> Option<Option<String>> {
        let mut state = self.lock();
        if state.binder.current_session_id() != Some(item.session_id.as_str()) {
            return None;
        }

        let tree = &mut state.tree;
        let parent_id = effective_parent(tree, item);
        if tree.contains(&item.temp_id) {
            tree.reparent(&item.temp_id, parent_id.as_deref());
            tree.update(&item.temp_id, MessagePatch::default().with_queued(false));
        } else {
            let mut message = item.placeholder();
            message.queued = false;
            tree.append(message, parent_id.as_deref());
        }
        Some(parent_id)
    }

    /// Fetches the ticket's session and, if the ticket is still current,
    /// swaps in the hydrated tree with that session's placeholders merged.
    async fn hydrate(&self, ticket: HydrationTicket) -> Result<SwitchOutcome, BranchError> {
        if !self.lock().binder.is_current(&ticket) {
            debug!(session_id = %ticket.session_id, "hydration superseded before fetch");
            return Ok(SwitchOutcome::Stale);
        }
        let fetched = self.backend.fetch_session(&ticket.session_id).await;

        let mut state = self.lock();
        if !state.binder.is_current(&ticket) {
            debug!(session_id = %ticket.session_id, "discarding stale hydration result");
            return Ok(SwitchOutcome::Stale);
        }

        let payload = match fetched {
            Ok(payload) => payload,
            Err(source) => {
                state.binder.abort(&ticket);
                warn!(session_id = %ticket.session_id, error = %source, "session hydration failed");
                return Err(BranchError::hydration(ticket.session_id, source));
            }
        };

        let HydratedTree {
            mut store,
            next_head_id,
            mode,
        } = build_tree(&payload.messages);
        let merged = state
            .queue
            .merge_placeholders(&ticket.session_id, &mut store, next_head_id.as_deref());

        state.binder.commit(&ticket, &payload);
        debug!(
            session_id = %ticket.session_id,
            messages = store.len(),
            placeholders = merged,
            mode = ?mode,
            "session hydrated"
        );
        state.tree.replace(store, next_head_id.clone());
        Ok(SwitchOutcome::Switched { head: next_head_id })
    }
}

#[async_trait]
impl BackgroundCheck for ChatController {
    async fn check_background_jobs(&self) -> Result<bool, BranchError> {
        ChatController::check_background_jobs(self).await
    }
}

enum Claim {
    Idle,
    Busy,
    Ready {
        item: PendingMessage,
        needs_switch: bool,
        latch: ProcessingLatch,
    },
}

/// Clears the processing flag when the in-flight item finishes or its
/// future is dropped.
struct ProcessingLatch {
    state: Arc<Mutex<ChatState>>,
}

impl Drop for ProcessingLatch {
    fn drop(&mut self) {
        lock_unpoisoned(&self.state).processing = false;
    }
}

/// Parent a queued turn is sent under: the current head, so the turn follows
/// whatever reply streamed in since it was queued. While the head is still a
/// queued placeholder (this item's or a later one's) the parent recorded at
/// enqueue time is used instead.
fn effective_parent(tree: &ConversationTree, item: &PendingMessage) -> Option<String> {
    let head = tree.head();
    let head_is_pending = head.is_some_and(|head| {
        head == item.temp_id || tree.get(head).is_some_and(|message| message.queued)
    });
    if !head_is_pending {
        return head.map(str::to_string);
    }

    item.parent_id
        .as_deref()
        .filter(|parent| tree.contains(parent))
        .or_else(|| {
            tree.get(&item.temp_id)
                .and_then(|placeholder| placeholder.parent_id.as_deref())
        })
        .map(str::to_string)
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
