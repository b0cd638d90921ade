//! Per-state configuration scope.

use crate::builder::machine::{StateRecord, TransitionRecord};
use crate::builder::transition::TransitionConfig;
use crate::core::{Action, Event, IntoActionResult, State};

/// Configuration scope for one state, returned by
/// [`StateMachineBuilder::in_state`](crate::builder::StateMachineBuilder::in_state).
pub struct StateConfig<'a, S: State, E: Event> {
    state: S,
    record: &'a mut StateRecord<S, E>,
}

impl<'a, S: State, E: Event> StateConfig<'a, S, E> {
    pub(crate) fn new(state: S, record: &'a mut StateRecord<S, E>) -> Self {
        Self { state, record }
    }

    /// The state being configured.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Set the action run whenever the state is entered.
    pub fn execute_on_entry<F, R>(self, action: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoActionResult,
    {
        self.record.entry.push(Action::new(action));
        self
    }

    /// Set the action run whenever the state is left by a non-internal
    /// transition.
    pub fn execute_on_exit<F, R>(self, action: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoActionResult,
    {
        self.record.exit.push(Action::new(action));
        self
    }

    /// Open a transition for `event`. Without a following
    /// [`goto`](TransitionConfig::goto) it is internal.
    pub fn on(self, event: E) -> TransitionConfig<'a, S, E> {
        let record = self.record;
        record.transitions.push(TransitionRecord::new(event));
        let position = record.transitions.len() - 1;
        TransitionConfig::new(self.state, record, position)
    }
}
