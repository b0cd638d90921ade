//! Machine instances.
//!
//! A machine owns a mutable current state, an event queue and a list of
//! extensions, all bound to one shared [`StateMachineDefinition`].
//! Two execution models are provided:
//!
//! - [`PassiveStateMachine`] executes queued events on whichever thread fired
//!   them, one at a time.
//! - [`ActiveStateMachine`] executes queued events on a dedicated tokio task.
//!
//! [`StateMachineDefinition`]: crate::definition::StateMachineDefinition

mod active;
mod passive;
pub(crate) mod queue;

pub use active::ActiveStateMachine;
pub use passive::PassiveStateMachine;

use crate::core::{Event, Payload, State};
use crate::engine::Extension;
use std::sync::Arc;
use uuid::Uuid;

/// How an active machine's consumer task winds down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Execute every event already queued, then stop.
    Graceful,
    /// Stop after the current transition and drop the undelivered queue.
    Immediate,
}

/// Failure of an active machine's consumer task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// `start` was called outside a tokio runtime.
    #[error("no tokio runtime available to run the state machine")]
    NoRuntime,
    /// The consumer task ended without handing its queue back, by panic or
    /// runtime shutdown. Its queued events went with it.
    #[error("state machine task was lost")]
    Lost,
    /// The consumer task panicked or was cancelled.
    #[error("state machine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Operations shared by both execution models.
pub trait StateMachine<S: State, E: Event> {
    fn id(&self) -> Uuid;

    /// `None` until the initial state has been entered.
    fn current_state(&self) -> Option<S>;

    fn is_running(&self) -> bool;

    /// Events queued but not yet executed.
    fn pending_events(&self) -> usize;

    fn add_extension(&self, extension: Arc<dyn Extension<S, E>>);

    fn fire_with(&self, event: E, payload: Payload);

    fn fire_priority_with(&self, event: E, payload: Payload);

    fn fire(&self, event: E) {
        self.fire_with(event, Payload::none());
    }

    fn fire_priority(&self, event: E) {
        self.fire_priority_with(event, Payload::none());
    }
}
