//! Extension that records every state switch.

use super::extension::{Extension, MachineInfo, TransitionContext};
use crate::core::{Event, State, StateHistory, StateTransition};
use chrono::Utc;
use parking_lot::Mutex;

/// Records state switches into a [`StateHistory`].
///
/// The triggering event is taken from the `firing_event` notification that
/// precedes every switch.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::StateMachineBuilder;
/// use switchyard::engine::HistoryRecorder;
/// use std::sync::Arc;
///
/// let mut builder = StateMachineBuilder::<i32, i32>::new();
/// builder.in_state(1).on(2).goto(2);
/// builder.in_state(2);
/// let machine = builder.with_initial_state(1).build().unwrap().create_passive_state_machine();
///
/// let recorder = Arc::new(HistoryRecorder::<i32, i32>::new());
/// machine.add_extension(recorder.clone());
/// machine.start();
/// machine.fire(2);
///
/// assert_eq!(recorder.snapshot().get_path(), vec![&1, &2]);
/// ```
pub struct HistoryRecorder<S: State, E: Event> {
    history: Mutex<StateHistory<S, E>>,
    firing: Mutex<Option<E>>,
}

impl<S: State, E: Event> HistoryRecorder<S, E> {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(StateHistory::new()),
            firing: Mutex::new(None),
        }
    }

    /// Copy of the history recorded so far.
    pub fn snapshot(&self) -> StateHistory<S, E> {
        self.history.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }
}

impl<S: State, E: Event> Default for HistoryRecorder<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State, E: Event> Extension<S, E> for HistoryRecorder<S, E> {
    fn firing_event(&self, _: &MachineInfo<S>, context: &TransitionContext<S, E>) {
        *self.firing.lock() = Some(context.event.clone());
    }

    fn fired_event(&self, _: &MachineInfo<S>, _: &TransitionContext<S, E>) {
        *self.firing.lock() = None;
    }

    fn transition_declined(&self, _: &MachineInfo<S>, _: &TransitionContext<S, E>) {
        *self.firing.lock() = None;
    }

    fn switched_state(&self, _: &MachineInfo<S>, old: Option<&S>, new: &S) {
        let event = if old.is_some() {
            self.firing.lock().clone()
        } else {
            None
        };
        self.history.lock().push(StateTransition {
            from: old.cloned(),
            to: new.clone(),
            event,
            timestamp: Utc::now(),
        });
    }
}
