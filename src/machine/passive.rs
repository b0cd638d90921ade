//! Passive state machine: events are executed on the firing thread.

use crate::config::MachineConfig;
use crate::core::{Event, Payload, State};
use crate::definition::StateMachineDefinition;
use crate::engine::{
    Engine, Extension, TransitionCompletedArgs, TransitionContext, TransitionExceptionArgs,
};
use crate::machine::queue::{event_queue, EventReceiver, EventSender};
use crate::machine::StateMachine;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

struct Shared<S: State, E: Event> {
    engine: Engine<S, E>,
    sender: EventSender<E>,
    // Whoever holds this lock is the single consumer.
    receiver: Mutex<EventReceiver<E>>,
    running: AtomicBool,
}

/// Machine that executes queued events on the thread that fires them.
///
/// `fire` enqueues and then, if no other thread is currently executing,
/// drains the queue itself. An event fired from inside an action is queued
/// and runs after the current transition, never nested inside it. Events
/// fired before [`start`](Self::start) wait in the queue.
///
/// Clones are handles to the same instance.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::StateMachineBuilder;
/// use switchyard::core::Payload;
///
/// let mut builder = StateMachineBuilder::<i32, i32>::new();
/// builder
///     .in_state(1)
///     .on(2)
///     .goto(2)
///     .execute_with(|p: &String| assert_eq!(p, "parameter"));
/// builder.in_state(2);
///
/// let machine = builder
///     .with_initial_state(1)
///     .build()
///     .unwrap()
///     .create_passive_state_machine();
/// machine.start();
/// machine.fire_with(2, Payload::new("parameter".to_string()));
///
/// assert_eq!(machine.current_state(), Some(2));
/// ```
pub struct PassiveStateMachine<S: State, E: Event> {
    shared: Arc<Shared<S, E>>,
}

impl<S: State, E: Event> Clone for PassiveStateMachine<S, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State, E: Event> PassiveStateMachine<S, E> {
    pub(crate) fn new(definition: StateMachineDefinition<S, E>, config: MachineConfig) -> Self {
        let (sender, receiver) = event_queue();
        Self {
            shared: Arc::new(Shared {
                engine: Engine::new(definition, config),
                sender,
                receiver: Mutex::new(receiver),
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.engine.id()
    }

    pub fn name(&self) -> &str {
        self.shared.engine.name()
    }

    pub fn definition(&self) -> &StateMachineDefinition<S, E> {
        self.shared.engine.definition()
    }

    /// `None` until the initial state has been entered.
    pub fn current_state(&self) -> Option<S> {
        self.shared.engine.current_state()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn pending_events(&self) -> usize {
        self.shared.sender.pending()
    }

    /// Register an observer. Registering the same one twice notifies it
    /// twice.
    pub fn add_extension(&self, extension: Arc<dyn Extension<S, E>>) {
        self.shared.engine.observers().add(extension);
    }

    pub fn clear_extensions(&self) {
        self.shared.engine.observers().clear();
    }

    /// Called for every contained callback failure.
    pub fn on_transition_exception<F>(&self, handler: F)
    where
        F: Fn(&TransitionExceptionArgs<S, E>) + Send + Sync + 'static,
    {
        self.shared
            .engine
            .observers()
            .on_exception(Arc::new(handler));
    }

    /// Called for events without an applicable transition, unless the
    /// declined policy is silent.
    pub fn on_transition_declined<F>(&self, handler: F)
    where
        F: Fn(&TransitionContext<S, E>) + Send + Sync + 'static,
    {
        self.shared.engine.observers().on_declined(Arc::new(handler));
    }

    pub fn on_transition_completed<F>(&self, handler: F)
    where
        F: Fn(&TransitionCompletedArgs<S, E>) + Send + Sync + 'static,
    {
        self.shared
            .engine
            .observers()
            .on_completed(Arc::new(handler));
    }

    /// Start processing. The first start enters the initial state before any
    /// queued event runs.
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let info = self.shared.engine.info();
        self.shared
            .engine
            .observers()
            .each("started", |ext| ext.started(&info));
        self.execute();
    }

    /// Stop processing after the current transition. Queued events stay
    /// queued until the next start.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let info = self.shared.engine.info();
        self.shared
            .engine
            .observers()
            .each("stopped", |ext| ext.stopped(&info));
    }

    pub fn fire(&self, event: E) {
        self.fire_with(event, Payload::none());
    }

    pub fn fire_with(&self, event: E, payload: Payload) {
        let info = self.shared.engine.info();
        self.shared.engine.observers().each("event_queued", |ext| {
            ext.event_queued(&info, &event, &payload)
        });
        self.shared.sender.send(event, payload);
        self.execute();
    }

    /// Fire ahead of every normally queued event.
    pub fn fire_priority(&self, event: E) {
        self.fire_priority_with(event, Payload::none());
    }

    pub fn fire_priority_with(&self, event: E, payload: Payload) {
        let info = self.shared.engine.info();
        self.shared
            .engine
            .observers()
            .each("event_queued_with_priority", |ext| {
                ext.event_queued_with_priority(&info, &event, &payload)
            });
        self.shared.sender.send_priority(event, payload);
        self.execute();
    }

    /// Drain the queue if no other consumer is active.
    fn execute(&self) {
        let shared = &self.shared;
        loop {
            if !self.is_running() {
                return;
            }
            let Some(mut receiver) = shared.receiver.try_lock() else {
                trace!(machine = %shared.engine.name(), "consumer busy; event left queued");
                return;
            };

            shared.engine.enter_initial_state();
            while self.is_running() {
                let Some(queued) = receiver.try_next() else {
                    break;
                };
                shared.engine.process(queued.event, queued.payload);
            }
            drop(receiver);

            // An event may have been queued after the last try_next but
            // before the lock was released.
            if shared.sender.pending() == 0 {
                return;
            }
            debug!(
                machine = %shared.engine.name(),
                pending = shared.sender.pending(),
                "resuming drain"
            );
        }
    }
}

impl<S: State, E: Event> StateMachine<S, E> for PassiveStateMachine<S, E> {
    fn id(&self) -> Uuid {
        PassiveStateMachine::id(self)
    }

    fn current_state(&self) -> Option<S> {
        PassiveStateMachine::current_state(self)
    }

    fn is_running(&self) -> bool {
        PassiveStateMachine::is_running(self)
    }

    fn pending_events(&self) -> usize {
        PassiveStateMachine::pending_events(self)
    }

    fn add_extension(&self, extension: Arc<dyn Extension<S, E>>) {
        PassiveStateMachine::add_extension(self, extension)
    }

    fn fire_with(&self, event: E, payload: Payload) {
        PassiveStateMachine::fire_with(self, event, payload)
    }

    fn fire_priority_with(&self, event: E, payload: Payload) {
        PassiveStateMachine::fire_priority_with(self, event, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateMachineBuilder;
    use crate::engine::MachineInfo;
    use std::sync::OnceLock;

    type Log = Arc<Mutex<Vec<String>>>;

    fn logger(log: &Log, entry: &str) -> impl Fn() + Send + Sync + 'static {
        let log = Arc::clone(log);
        let entry = entry.to_string();
        move || log.lock().push(entry.clone())
    }

    fn counter_machine() -> PassiveStateMachine<u32, &'static str> {
        let mut builder = StateMachineBuilder::new();
        builder.in_state(0).on("inc").goto(1);
        builder.in_state(1).on("inc").goto(2);
        builder.in_state(2).on("inc").goto(3);
        builder.in_state(3);
        builder
            .with_initial_state(0)
            .build()
            .unwrap()
            .create_passive_state_machine()
    }

    #[test]
    fn events_before_start_wait() {
        let machine = counter_machine();
        machine.fire("inc");
        machine.fire("inc");

        assert_eq!(machine.current_state(), None);
        assert_eq!(machine.pending_events(), 2);

        machine.start();

        assert_eq!(machine.current_state(), Some(2));
        assert_eq!(machine.pending_events(), 0);
    }

    #[test]
    fn stop_keeps_queue() {
        let machine = counter_machine();
        machine.start();
        machine.fire("inc");
        machine.stop();
        machine.fire("inc");

        assert!(!machine.is_running());
        assert_eq!(machine.current_state(), Some(1));
        assert_eq!(machine.pending_events(), 1);

        machine.start();
        assert_eq!(machine.current_state(), Some(2));
    }

    #[test]
    fn restart_does_not_reenter_initial_state() {
        let log: Log = Arc::default();
        let mut builder = StateMachineBuilder::<u8, u8>::new();
        builder.in_state(1).execute_on_entry(logger(&log, "entry"));
        let machine = builder
            .with_initial_state(1)
            .build()
            .unwrap()
            .create_passive_state_machine();

        machine.start();
        machine.start();
        machine.stop();
        machine.start();

        assert_eq!(*log.lock(), vec!["entry"]);
    }

    #[test]
    fn reentrant_fire_runs_after_current_transition() {
        let log: Log = Arc::default();
        let slot: Arc<OnceLock<PassiveStateMachine<u8, u8>>> = Arc::new(OnceLock::new());

        let mut builder = StateMachineBuilder::<u8, u8>::new();
        let handle = Arc::clone(&slot);
        let first_log = Arc::clone(&log);
        builder
            .in_state(1)
            .on(1)
            .goto(2)
            .execute(move || {
                first_log.lock().push("fire 2".to_string());
                if let Some(machine) = handle.get() {
                    machine.fire(2);
                }
                first_log.lock().push("first done".to_string());
            });
        builder
            .in_state(2)
            .execute_on_entry(logger(&log, "entry 2"))
            .on(2)
            .goto(3)
            .execute(logger(&log, "second"));
        builder.in_state(3);

        let machine = builder
            .with_initial_state(1)
            .build()
            .unwrap()
            .create_passive_state_machine();
        let _ = slot.set(machine.clone());

        machine.start();
        machine.fire(1);

        assert_eq!(machine.current_state(), Some(3));
        assert_eq!(
            *log.lock(),
            vec!["fire 2", "first done", "entry 2", "second"]
        );
    }

    #[test]
    fn priority_event_runs_first() {
        let machine = counter_machine();
        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        machine.on_transition_declined(move |ctx| sink.lock().push(ctx.event));

        machine.fire("first");
        machine.fire_priority("urgent");
        machine.start();

        assert_eq!(*order.lock(), vec!["urgent", "first"]);
    }

    #[test]
    fn lifecycle_notifications() {
        #[derive(Default)]
        struct Lifecycle(Mutex<Vec<&'static str>>);

        impl Extension<u32, &'static str> for Lifecycle {
            fn started(&self, _: &MachineInfo<u32>) {
                self.0.lock().push("started");
            }
            fn stopped(&self, _: &MachineInfo<u32>) {
                self.0.lock().push("stopped");
            }
            fn event_queued(&self, _: &MachineInfo<u32>, _: &&'static str, _: &Payload) {
                self.0.lock().push("queued");
            }
            fn entering_initial_state(&self, _: &MachineInfo<u32>, _: &u32) {
                self.0.lock().push("entering");
            }
            fn entered_initial_state(&self, _: &MachineInfo<u32>, _: &u32) {
                self.0.lock().push("entered");
            }
            fn firing_event(&self, _: &MachineInfo<u32>, _: &TransitionContext<u32, &'static str>) {
                self.0.lock().push("firing");
            }
            fn fired_event(&self, _: &MachineInfo<u32>, _: &TransitionContext<u32, &'static str>) {
                self.0.lock().push("fired");
            }
        }

        let machine = counter_machine();
        let lifecycle = Arc::new(Lifecycle::default());
        machine.add_extension(lifecycle.clone());

        machine.start();
        machine.fire("inc");
        machine.stop();

        assert_eq!(
            *lifecycle.0.lock(),
            vec!["started", "entering", "entered", "queued", "firing", "fired", "stopped"]
        );
    }

    #[test]
    fn concurrent_firing_executes_every_event_once() {
        let count = Arc::new(Mutex::new(0_u32));
        let mut builder = StateMachineBuilder::<u8, u8>::new();
        let sink = Arc::clone(&count);
        builder.in_state(1).on(1).execute(move || *sink.lock() += 1);
        let machine = builder
            .with_initial_state(1)
            .build()
            .unwrap()
            .create_passive_state_machine();
        machine.start();

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let machine = machine.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        machine.fire(1);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(*count.lock(), 1000);
        assert_eq!(machine.pending_events(), 0);
    }

    #[test]
    fn clear_extensions_stops_notifications() {
        #[derive(Default)]
        struct Count(Mutex<u32>);
        impl Extension<u32, &'static str> for Count {
            fn switched_state(&self, _: &MachineInfo<u32>, _: Option<&u32>, _: &u32) {
                *self.0.lock() += 1;
            }
        }

        let machine = counter_machine();
        let count = Arc::new(Count::default());
        machine.add_extension(count.clone());
        machine.start();
        machine.clear_extensions();
        machine.fire("inc");

        assert_eq!(*count.0.lock(), 1);
    }
}
