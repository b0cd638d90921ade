//! Extension that logs every lifecycle notification through `tracing`.

use super::extension::{
    Extension, MachineInfo, TransitionCompletedArgs, TransitionContext, TransitionExceptionArgs,
};
use crate::core::{Event, Payload, State};
use tracing::{debug, info, warn};

/// Logs lifecycle notifications. Register it like any other extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExtension;

impl<S: State, E: Event> Extension<S, E> for TracingExtension {
    fn started(&self, machine: &MachineInfo<S>) {
        info!(machine = %machine.name, id = %machine.id, "state machine started");
    }

    fn stopped(&self, machine: &MachineInfo<S>) {
        info!(machine = %machine.name, id = %machine.id, "state machine stopped");
    }

    fn event_queued(&self, machine: &MachineInfo<S>, event: &E, payload: &Payload) {
        debug!(machine = %machine.name, event = ?event, ?payload, "event queued");
    }

    fn event_queued_with_priority(&self, machine: &MachineInfo<S>, event: &E, payload: &Payload) {
        debug!(machine = %machine.name, event = ?event, ?payload, "priority event queued");
    }

    fn entered_initial_state(&self, machine: &MachineInfo<S>, state: &S) {
        info!(machine = %machine.name, state = ?state, "entered initial state");
    }

    fn switched_state(&self, machine: &MachineInfo<S>, old: Option<&S>, new: &S) {
        info!(machine = %machine.name, from = ?old, to = ?new, "switched state");
    }

    fn transition_declined(&self, machine: &MachineInfo<S>, context: &TransitionContext<S, E>) {
        debug!(
            machine = %machine.name,
            state = ?context.state,
            event = ?context.event,
            "transition declined"
        );
    }

    fn transition_completed(&self, machine: &MachineInfo<S>, args: &TransitionCompletedArgs<S, E>) {
        debug!(
            machine = %machine.name,
            source = ?args.source,
            target = ?args.target,
            event = ?args.event,
            kind = ?args.kind,
            "transition completed"
        );
    }

    fn transition_exception(&self, machine: &MachineInfo<S>, args: &TransitionExceptionArgs<S, E>) {
        warn!(
            machine = %machine.name,
            state = ?args.state,
            event = ?args.event,
            stage = %args.stage,
            error = %args.error,
            "transition action failed"
        );
    }
}
