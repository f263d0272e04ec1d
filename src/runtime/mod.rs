//! Async orchestration around the tree: the pending queue, session binding,
//! background polling, and the controller that owns them.

pub mod controller;
pub mod poller;
pub mod queue;
pub mod session;
