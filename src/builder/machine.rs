//! Builder for constructing state machine definitions.

use crate::builder::error::{BuildError, BuildErrors};
use crate::builder::state::StateConfig;
use crate::builder::validation;
use crate::core::{Action, Event, Guard, State};
use crate::definition::{StateMachineDefinition, StateDefinition, TransitionDefinition};
use std::collections::HashMap;
use stillwater::validation::Validation;
use tracing::debug;

/// Everything configured for one state so far.
///
/// Slots that must hold at most one value are kept as lists so that
/// validation can report every duplicate at once.
pub(crate) struct StateRecord<S, E> {
    pub(crate) entry: Vec<Action>,
    pub(crate) exit: Vec<Action>,
    pub(crate) transitions: Vec<TransitionRecord<S, E>>,
}

impl<S, E> StateRecord<S, E> {
    fn new() -> Self {
        Self {
            entry: Vec::new(),
            exit: Vec::new(),
            transitions: Vec::new(),
        }
    }
}

pub(crate) struct TransitionRecord<S, E> {
    pub(crate) event: E,
    pub(crate) targets: Vec<S>,
    pub(crate) guards: Vec<Guard>,
    pub(crate) actions: Vec<Action>,
}

impl<S, E> TransitionRecord<S, E> {
    pub(crate) fn new(event: E) -> Self {
        Self {
            event,
            targets: Vec::new(),
            guards: Vec::new(),
            actions: Vec::new(),
        }
    }
}

/// Builder for constructing state machine definitions with a fluent API.
///
/// Configuring the same state several times merges the configuration.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::StateMachineBuilder;
///
/// let mut builder = StateMachineBuilder::<i32, i32>::new();
/// builder
///     .in_state(1)
///     .on(2)
///     .goto(2)
///     .execute(|| println!("moving"));
/// builder.in_state(2).execute_on_entry(|| println!("arrived"));
///
/// let definition = builder.with_initial_state(1).build().unwrap();
/// assert_eq!(definition.initial_state(), &1);
/// ```
pub struct StateMachineBuilder<S: State, E: Event> {
    states: Vec<(S, StateRecord<S, E>)>,
    index: HashMap<S, usize>,
    initial: Option<S>,
}

impl<S: State, E: Event> StateMachineBuilder<S, E> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            index: HashMap::new(),
            initial: None,
        }
    }

    /// Begin or resume configuration of `state`.
    pub fn in_state(&mut self, state: S) -> StateConfig<'_, S, E> {
        let position = match self.index.get(&state) {
            Some(position) => *position,
            None => {
                self.states.push((state.clone(), StateRecord::new()));
                let position = self.states.len() - 1;
                self.index.insert(state.clone(), position);
                position
            }
        };
        let (_, record) = &mut self.states[position];
        StateConfig::new(state, record)
    }

    /// Set the initial state (required).
    pub fn with_initial_state(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Validate and freeze the definition.
    ///
    /// Reports every configuration error found, not only the first.
    pub fn build(self) -> Result<StateMachineDefinition<S, E>, BuildErrors> {
        if let Validation::Failure(errors) =
            validation::validate(&self.states, &self.index, self.initial.as_ref())
        {
            return Err(BuildErrors::new(errors.iter().cloned().collect()));
        }

        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        let states: HashMap<S, StateDefinition<S, E>> = self
            .states
            .into_iter()
            .map(|(id, record)| {
                let transitions = record
                    .transitions
                    .into_iter()
                    .map(|t| {
                        let definition = TransitionDefinition {
                            source: id.clone(),
                            event: t.event.clone(),
                            target: t.targets.into_iter().next(),
                            guard: t.guards.into_iter().next(),
                            actions: t.actions,
                        };
                        (t.event, definition)
                    })
                    .collect();
                let definition = StateDefinition {
                    id: id.clone(),
                    entry: record.entry.into_iter().next(),
                    exit: record.exit.into_iter().next(),
                    transitions,
                };
                (id, definition)
            })
            .collect();

        debug!(states = states.len(), initial = ?initial, "built state machine definition");

        Ok(StateMachineDefinition::new(states, initial))
    }
}

impl<S: State, E: Event> Default for StateMachineBuilder<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Start a definition for states of type `S` and events of type `E`.
pub fn for_machine<S: State, E: Event>() -> StateMachineBuilder<S, E> {
    StateMachineBuilder::new()
}
