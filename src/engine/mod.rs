//! Transition execution engine.
//!
//! The [`Engine`] executes one dequeued event at a time: resolve, guard,
//! exit, actions, entry, notify. Every user callback runs behind its own
//! containment boundary. A failing callback becomes a
//! [`TransitionExceptionArgs`] notification and the transition carries on,
//! so the current state always follows the declared graph.
//!
//! The engine never queues anything itself; the machines in
//! [`crate::machine`] own the queue and guarantee that only one consumer
//! calls [`Engine::process`] at a time.

mod extension;
pub mod history;
pub mod tracing_ext;

pub use extension::{
    Extension, MachineInfo, TransitionCompletedArgs, TransitionContext, TransitionExceptionArgs,
};
pub use history::HistoryRecorder;
pub use tracing_ext::TracingExtension;

pub(crate) use extension::Observers;

use crate::config::{DeclinedPolicy, MachineConfig};
use crate::core::{Action, ActionError, ActionStage, Event, Payload, State};
use crate::definition::{Resolution, StateMachineDefinition, TransitionDefinition};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::watch;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Single-consumer executor shared by the passive and active machines.
pub(crate) struct Engine<S: State, E: Event> {
    id: Uuid,
    name: String,
    definition: StateMachineDefinition<S, E>,
    config: MachineConfig,
    current: watch::Sender<Option<S>>,
    observers: Observers<S, E>,
}

impl<S: State, E: Event> Engine<S, E> {
    pub(crate) fn new(definition: StateMachineDefinition<S, E>, config: MachineConfig) -> Self {
        let id = Uuid::new_v4();
        let name = config.name.clone().unwrap_or_else(|| id.to_string());
        let (current, _) = watch::channel(None);
        Self {
            id,
            name,
            observers: Observers::new(config.contain_panics),
            definition,
            config,
            current,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn definition(&self) -> &StateMachineDefinition<S, E> {
        &self.definition
    }

    pub(crate) fn observers(&self) -> &Observers<S, E> {
        &self.observers
    }

    pub(crate) fn current_state(&self) -> Option<S> {
        self.current.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<S>> {
        self.current.subscribe()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub(crate) fn info(&self) -> MachineInfo<S> {
        MachineInfo {
            id: self.id,
            name: self.name.clone(),
            current_state: self.current_state(),
        }
    }

    fn set_current(&self, state: S) {
        self.current.send_replace(Some(state));
    }

    /// Enter the initial state unless that already happened.
    ///
    /// Runs the entry action and reports `switched_state(None, initial)`.
    /// No exit action is involved.
    pub(crate) fn enter_initial_state(&self) {
        if self.is_initialized() {
            return;
        }
        let initial = self.definition.initial_state().clone();
        debug!(machine = %self.name, state = ?initial, "entering initial state");

        let info = self.info();
        self.observers.each("entering_initial_state", |ext| {
            ext.entering_initial_state(&info, &initial)
        });

        self.set_current(initial.clone());
        if let Some(entry) = self
            .definition
            .state(&initial)
            .and_then(|state| state.entry_action())
        {
            self.run_action(
                entry,
                ActionStage::Entry,
                &initial,
                None,
                &Payload::none(),
            );
        }

        let info = self.info();
        self.observers.each("switched_state", |ext| {
            ext.switched_state(&info, None, &initial)
        });
        self.observers.each("entered_initial_state", |ext| {
            ext.entered_initial_state(&info, &initial)
        });
    }

    /// Execute one event to completion.
    pub(crate) fn process(&self, event: E, payload: Payload) {
        let Some(source) = self.current_state() else {
            warn!(machine = %self.name, event = ?event, "event processed before initial state; dropped");
            return;
        };

        let context = TransitionContext {
            state: source.clone(),
            event,
            payload,
        };
        let info = self.info();
        self.observers.each("firing_event", |ext| {
            ext.firing_event(&info, &context)
        });

        match self.definition.resolve(&source, &context.event) {
            Resolution::NoTransition => {
                trace!(machine = %self.name, state = ?source, event = ?context.event, "no transition");
                self.decline(&context);
                return;
            }
            Resolution::Transition(transition) => {
                if !self.guard_allows(transition, &context) {
                    self.decline(&context);
                    return;
                }
                self.execute(transition, &context);
            }
        }

        let info = self.info();
        self.observers.each("fired_event", |ext| ext.fired_event(&info, &context));
    }

    fn decline(&self, context: &TransitionContext<S, E>) {
        if self.config.declined_policy == DeclinedPolicy::Silent {
            return;
        }
        debug!(
            machine = %self.name,
            state = ?context.state,
            event = ?context.event,
            "transition declined"
        );
        self.observers.declined(&self.info(), context);
    }

    fn guard_allows(
        &self,
        transition: &TransitionDefinition<S, E>,
        context: &TransitionContext<S, E>,
    ) -> bool {
        let Some(guard) = transition.guard() else {
            return true;
        };
        match self.contain(|| guard.check(&context.payload)) {
            Ok(allowed) => allowed,
            Err(error) => {
                self.report(
                    ActionStage::Guard,
                    &context.state,
                    Some(&context.event),
                    &context.payload,
                    error,
                );
                false
            }
        }
    }

    fn execute(&self, transition: &TransitionDefinition<S, E>, context: &TransitionContext<S, E>) {
        let source = &context.state;
        let event = Some(&context.event);
        let payload = &context.payload;
        debug!(
            machine = %self.name,
            state = ?source,
            event = ?context.event,
            target = ?transition.target(),
            "executing transition"
        );

        if transition.target().is_some() {
            if let Some(exit) = self
                .definition
                .state(source)
                .and_then(|state| state.exit_action())
            {
                self.run_action(exit, ActionStage::Exit, source, event, payload);
            }
        }

        for action in transition.actions() {
            self.run_action(action, ActionStage::Transition, source, event, payload);
        }

        let current = match transition.target() {
            Some(target) => {
                self.set_current(target.clone());
                if let Some(entry) = self
                    .definition
                    .state(target)
                    .and_then(|state| state.entry_action())
                {
                    self.run_action(entry, ActionStage::Entry, source, event, payload);
                }
                let info = self.info();
                self.observers.each("switched_state", |ext| {
                    ext.switched_state(&info, Some(source), target)
                });
                target.clone()
            }
            None => source.clone(),
        };

        let completed = TransitionCompletedArgs {
            source: source.clone(),
            target: current,
            event: context.event.clone(),
            payload: payload.clone(),
            kind: transition.kind(),
        };
        self.observers.completed(&self.info(), &completed);
    }

    /// Run one callback behind the containment boundary. Failures are
    /// reported and swallowed.
    fn run_action(
        &self,
        action: &Action,
        stage: ActionStage,
        state: &S,
        event: Option<&E>,
        payload: &Payload,
    ) {
        if let Err(error) = self.contain(|| action.invoke(payload)) {
            self.report(stage, state, event, payload, error);
        }
    }

    fn contain<T>(&self, call: impl FnOnce() -> Result<T, ActionError>) -> Result<T, ActionError> {
        if !self.config.contain_panics {
            return call();
        }
        catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|panic| Err(ActionError::from_panic(panic)))
    }

    fn report(
        &self,
        stage: ActionStage,
        state: &S,
        event: Option<&E>,
        payload: &Payload,
        error: ActionError,
    ) {
        warn!(
            machine = %self.name,
            state = ?state,
            event = ?event,
            %stage,
            %error,
            "action failed; transition continues"
        );
        let args = TransitionExceptionArgs {
            state: state.clone(),
            event: event.cloned(),
            payload: payload.clone(),
            stage,
            error,
        };
        self.observers.exception(&self.info(), &args);
    }
}
