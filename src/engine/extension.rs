//! Observers of machine lifecycle events.
//!
//! Extensions are notified synchronously, in registration order. They cannot
//! influence transition resolution, and a panicking extension is logged and
//! skipped so the remaining ones are still notified.

use crate::core::{ActionError, ActionStage, Event, Payload, State};
use crate::definition::TransitionKind;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Snapshot of the machine handed to every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInfo<S> {
    pub id: Uuid,
    pub name: String,
    pub current_state: Option<S>,
}

/// An event as it travels through the machine.
#[derive(Debug, Clone)]
pub struct TransitionContext<S, E> {
    /// Current state when the event was taken from the queue.
    pub state: S,
    pub event: E,
    pub payload: Payload,
}

/// Details of a failed callback.
#[derive(Debug, Clone)]
pub struct TransitionExceptionArgs<S, E> {
    /// The state the transition started from, or the initial state for a
    /// failure while entering it.
    pub state: S,
    /// `None` only for failures while entering the initial state.
    pub event: Option<E>,
    pub payload: Payload,
    pub stage: ActionStage,
    pub error: ActionError,
}

/// Details of a completed transition.
#[derive(Debug, Clone)]
pub struct TransitionCompletedArgs<S, E> {
    pub source: S,
    /// Current state after the transition. Equal to `source` for internal
    /// and self transitions.
    pub target: S,
    pub event: E,
    pub payload: Payload,
    pub kind: TransitionKind,
}

/// Lifecycle observer. Every method defaults to doing nothing.
///
/// # Example
///
/// ```rust
/// use switchyard::engine::{Extension, MachineInfo};
/// use parking_lot::Mutex;
///
/// #[derive(Default)]
/// struct CurrentState(Mutex<Option<i32>>);
///
/// impl Extension<i32, i32> for CurrentState {
///     fn switched_state(&self, _: &MachineInfo<i32>, _old: Option<&i32>, new: &i32) {
///         *self.0.lock() = Some(*new);
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait Extension<S: State, E: Event>: Send + Sync {
    fn started(&self, machine: &MachineInfo<S>) {}

    fn stopped(&self, machine: &MachineInfo<S>) {}

    fn event_queued(&self, machine: &MachineInfo<S>, event: &E, payload: &Payload) {}

    fn event_queued_with_priority(&self, machine: &MachineInfo<S>, event: &E, payload: &Payload) {
    }

    fn firing_event(&self, machine: &MachineInfo<S>, context: &TransitionContext<S, E>) {}

    fn fired_event(&self, machine: &MachineInfo<S>, context: &TransitionContext<S, E>) {}

    fn entering_initial_state(&self, machine: &MachineInfo<S>, state: &S) {}

    fn entered_initial_state(&self, machine: &MachineInfo<S>, state: &S) {}

    /// `old` is `None` when entering the initial state.
    fn switched_state(&self, machine: &MachineInfo<S>, old: Option<&S>, new: &S) {}

    fn transition_declined(&self, machine: &MachineInfo<S>, context: &TransitionContext<S, E>) {}

    fn transition_completed(
        &self,
        machine: &MachineInfo<S>,
        args: &TransitionCompletedArgs<S, E>,
    ) {
    }

    fn transition_exception(
        &self,
        machine: &MachineInfo<S>,
        args: &TransitionExceptionArgs<S, E>,
    ) {
    }
}

type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Registered extensions plus the closure handlers of a machine.
pub(crate) struct Observers<S: State, E: Event> {
    extensions: RwLock<Vec<Arc<dyn Extension<S, E>>>>,
    exception: RwLock<Vec<Handler<TransitionExceptionArgs<S, E>>>>,
    declined: RwLock<Vec<Handler<TransitionContext<S, E>>>>,
    completed: RwLock<Vec<Handler<TransitionCompletedArgs<S, E>>>>,
    contain_panics: bool,
}

impl<S: State, E: Event> Observers<S, E> {
    pub(crate) fn new(contain_panics: bool) -> Self {
        Self {
            extensions: RwLock::new(Vec::new()),
            exception: RwLock::new(Vec::new()),
            declined: RwLock::new(Vec::new()),
            completed: RwLock::new(Vec::new()),
            contain_panics,
        }
    }

    /// Duplicates are kept and notified once per registration.
    pub(crate) fn add(&self, extension: Arc<dyn Extension<S, E>>) {
        self.extensions.write().push(extension);
    }

    pub(crate) fn clear(&self) {
        self.extensions.write().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.extensions.read().len()
    }

    pub(crate) fn on_exception(&self, handler: Handler<TransitionExceptionArgs<S, E>>) {
        self.exception.write().push(handler);
    }

    pub(crate) fn on_declined(&self, handler: Handler<TransitionContext<S, E>>) {
        self.declined.write().push(handler);
    }

    pub(crate) fn on_completed(&self, handler: Handler<TransitionCompletedArgs<S, E>>) {
        self.completed.write().push(handler);
    }

    fn guarded(&self, hook: &'static str, call: impl FnOnce()) {
        if !self.contain_panics {
            call();
            return;
        }
        if catch_unwind(AssertUnwindSafe(call)).is_err() {
            warn!(hook, "listener panicked; continuing with remaining listeners");
        }
    }

    /// Call `notify` on a snapshot of the extensions, so listeners may
    /// register further extensions without deadlocking.
    pub(crate) fn each(&self, hook: &'static str, notify: impl Fn(&dyn Extension<S, E>)) {
        let snapshot: Vec<_> = self.extensions.read().clone();
        for extension in snapshot {
            self.guarded(hook, || notify(extension.as_ref()));
        }
    }

    pub(crate) fn exception(&self, machine: &MachineInfo<S>, args: &TransitionExceptionArgs<S, E>) {
        self.each("transition_exception", |ext| {
            ext.transition_exception(machine, args)
        });
        let handlers: Vec<_> = self.exception.read().clone();
        for handler in handlers {
            self.guarded("on_transition_exception", || handler(args));
        }
    }

    pub(crate) fn declined(&self, machine: &MachineInfo<S>, context: &TransitionContext<S, E>) {
        self.each("transition_declined", |ext| {
            ext.transition_declined(machine, context)
        });
        let handlers: Vec<_> = self.declined.read().clone();
        for handler in handlers {
            self.guarded("on_transition_declined", || handler(context));
        }
    }

    pub(crate) fn completed(&self, machine: &MachineInfo<S>, args: &TransitionCompletedArgs<S, E>) {
        self.each("transition_completed", |ext| {
            ext.transition_completed(machine, args)
        });
        let handlers: Vec<_> = self.completed.read().clone();
        for handler in handlers {
            self.guarded("on_transition_completed", || handler(args));
        }
    }
}
