//! Per-transition configuration scope.

use crate::builder::machine::{StateRecord, TransitionRecord};
use crate::core::{Action, Event, Guard, IntoActionResult, Payload, State};
use std::any::Any;

/// Configuration scope for one (state, event) transition.
pub struct TransitionConfig<'a, S: State, E: Event> {
    state: S,
    record: &'a mut StateRecord<S, E>,
    position: usize,
}

impl<'a, S: State, E: Event> TransitionConfig<'a, S, E> {
    pub(crate) fn new(state: S, record: &'a mut StateRecord<S, E>, position: usize) -> Self {
        Self {
            state,
            record,
            position,
        }
    }

    fn transition(&mut self) -> &mut TransitionRecord<S, E> {
        &mut self.record.transitions[self.position]
    }

    /// Make this a transition to `target`.
    pub fn goto(mut self, target: S) -> Self {
        self.transition().targets.push(target);
        self
    }

    /// Attach a guard.
    pub fn guard(mut self, guard: Guard) -> Self {
        self.transition().guards.push(guard);
        self
    }

    /// Attach a guard using a closure over the raw payload.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&Payload) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Attach a guard using a closure over a payload of type `T`.
    pub fn when_with<T, F>(self, predicate: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::typed(predicate))
    }

    /// Append a payload-agnostic action.
    pub fn execute<F, R>(mut self, action: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoActionResult,
    {
        self.transition().actions.push(Action::new(action));
        self
    }

    /// Append an action that consumes the fired payload as a `T`.
    pub fn execute_with<T, F, R>(mut self, action: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoActionResult,
    {
        self.transition().actions.push(Action::typed(action));
        self
    }

    /// Open another transition on the same state.
    pub fn on(self, event: E) -> TransitionConfig<'a, S, E> {
        let record = self.record;
        record.transitions.push(TransitionRecord::new(event));
        let position = record.transitions.len() - 1;
        TransitionConfig::new(self.state, record, position)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::StateMachineBuilder;
    use crate::core::Payload;

    #[test]
    fn goto_sets_target() {
        let mut builder = StateMachineBuilder::<u8, u8>::new();
        builder.in_state(1).on(5).goto(2);
        builder.in_state(2);

        let definition = builder.with_initial_state(1).build().unwrap();
        let transition = definition.resolve(&1, &5).transition().unwrap();
        assert_eq!(transition.target(), Some(&2));
        assert!(transition.actions().is_empty());
    }

    #[test]
    fn omitting_goto_is_internal() {
        let mut builder = StateMachineBuilder::<u8, u8>::new();
        builder.in_state(1).on(5).execute(|| {});

        let definition = builder.with_initial_state(1).build().unwrap();
        let transition = definition.resolve(&1, &5).transition().unwrap();
        assert!(transition.target().is_none());
        assert_eq!(transition.actions().len(), 1);
    }

    #[test]
    fn guard_is_stored() {
        let mut builder = StateMachineBuilder::<u8, u8>::new();
        builder
            .in_state(1)
            .on(5)
            .when_with(|n: &u32| *n > 3)
            .goto(1);

        let definition = builder.with_initial_state(1).build().unwrap();
        let guard = definition
            .resolve(&1, &5)
            .transition()
            .and_then(|t| t.guard())
            .cloned()
            .unwrap();
        assert!(guard.check(&Payload::new(4_u32)).unwrap());
        assert!(!guard.check(&Payload::new(2_u32)).unwrap());
    }

    #[test]
    fn second_goto_is_rejected() {
        let mut builder = StateMachineBuilder::<u8, u8>::new();
        builder.in_state(1).on(5).goto(1).goto(1);

        let errors = builder.with_initial_state(1).build().err().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors.to_string().contains("more than one target"));
    }

    #[test]
    fn second_guard_is_rejected() {
        let mut builder = StateMachineBuilder::<u8, u8>::new();
        builder
            .in_state(1)
            .on(5)
            .when(|_| true)
            .when(|_| false);

        let errors = builder.with_initial_state(1).build().err().unwrap();
        assert!(errors.to_string().contains("more than one guard"));
    }
}
