//! Immutable state machine definition.
//!
//! A [`StateMachineDefinition`] is produced by
//! [`StateMachineBuilder::build`](crate::builder::StateMachineBuilder::build)
//! and never changes afterwards. It is cheap to clone and is shared read-only
//! by every machine instance created from it.

mod resolver;

pub use resolver::Resolution;

use crate::config::MachineConfig;
use crate::core::{Action, Event, Guard, State};
use crate::machine::{ActiveStateMachine, PassiveStateMachine};
use std::collections::HashMap;
use std::sync::Arc;

/// How a transition affects the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Target declared and different from the source.
    Normal,
    /// Target declared and equal to the source. Exit and entry still run.
    SelfTransition,
    /// No target declared. Only the actions run.
    Internal,
}

/// A (source, event) rule.
pub struct TransitionDefinition<S, E> {
    pub(crate) source: S,
    pub(crate) event: E,
    pub(crate) target: Option<S>,
    pub(crate) guard: Option<Guard>,
    pub(crate) actions: Vec<Action>,
}

impl<S: State, E: Event> TransitionDefinition<S, E> {
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn event(&self) -> &E {
        &self.event
    }

    pub fn target(&self) -> Option<&S> {
        self.target.as_ref()
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    /// Actions in declaration order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Classify by target presence. Internal is decided solely by the absence
    /// of a target, never by state equality.
    pub fn kind(&self) -> TransitionKind {
        match &self.target {
            None => TransitionKind::Internal,
            Some(target) if *target == self.source => TransitionKind::SelfTransition,
            Some(_) => TransitionKind::Normal,
        }
    }
}

/// A declared state with its entry/exit actions and outgoing transitions.
pub struct StateDefinition<S, E> {
    pub(crate) id: S,
    pub(crate) entry: Option<Action>,
    pub(crate) exit: Option<Action>,
    pub(crate) transitions: HashMap<E, TransitionDefinition<S, E>>,
}

impl<S: State, E: Event> StateDefinition<S, E> {
    pub fn id(&self) -> &S {
        &self.id
    }

    pub fn entry_action(&self) -> Option<&Action> {
        self.entry.as_ref()
    }

    pub fn exit_action(&self) -> Option<&Action> {
        self.exit.as_ref()
    }

    pub fn transition(&self, event: &E) -> Option<&TransitionDefinition<S, E>> {
        self.transitions.get(event)
    }

    pub fn transitions(&self) -> impl Iterator<Item = &TransitionDefinition<S, E>> {
        self.transitions.values()
    }
}

struct DefinitionInner<S, E> {
    states: HashMap<S, StateDefinition<S, E>>,
    initial: S,
}

/// Validated, immutable transition graph.
pub struct StateMachineDefinition<S, E> {
    inner: Arc<DefinitionInner<S, E>>,
}

impl<S, E> Clone for StateMachineDefinition<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: State, E: Event> StateMachineDefinition<S, E> {
    /// Assemble an already validated graph.
    pub(crate) fn new(states: HashMap<S, StateDefinition<S, E>>, initial: S) -> Self {
        Self {
            inner: Arc::new(DefinitionInner { states, initial }),
        }
    }

    pub fn initial_state(&self) -> &S {
        &self.inner.initial
    }

    pub fn state(&self, id: &S) -> Option<&StateDefinition<S, E>> {
        self.inner.states.get(id)
    }

    pub fn states(&self) -> impl Iterator<Item = &StateDefinition<S, E>> {
        self.inner.states.values()
    }

    pub fn contains_state(&self, id: &S) -> bool {
        self.inner.states.contains_key(id)
    }

    /// Look up the transition for `event` fired in `state`.
    pub fn resolve(&self, state: &S, event: &E) -> Resolution<'_, S, E> {
        resolver::resolve(self, state, event)
    }

    /// Check whether two handles share the same underlying graph.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Allocate a fresh passive machine bound to this definition.
    pub fn create_passive_state_machine(&self) -> PassiveStateMachine<S, E> {
        self.create_passive_state_machine_with(MachineConfig::default())
    }

    pub fn create_passive_state_machine_with(
        &self,
        config: MachineConfig,
    ) -> PassiveStateMachine<S, E> {
        PassiveStateMachine::new(self.clone(), config)
    }

    /// Allocate a fresh machine whose consumer runs on a tokio task.
    pub fn create_active_state_machine(&self) -> ActiveStateMachine<S, E> {
        self.create_active_state_machine_with(MachineConfig::default())
    }

    pub fn create_active_state_machine_with(
        &self,
        config: MachineConfig,
    ) -> ActiveStateMachine<S, E> {
        ActiveStateMachine::new(self.clone(), config)
    }
}
