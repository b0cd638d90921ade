//! Active state machine: events are executed on a dedicated tokio task.

use crate::config::MachineConfig;
use crate::core::{Event, Payload, State};
use crate::definition::StateMachineDefinition;
use crate::engine::{
    Engine, Extension, TransitionCompletedArgs, TransitionContext, TransitionExceptionArgs,
};
use crate::machine::queue::{event_queue, EventReceiver, EventSender};
use crate::machine::{ShutdownMode, StateMachine, TaskError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Everything the consumer task owns while it runs.
struct Consumer<E> {
    queue: EventReceiver<E>,
    control: mpsc::UnboundedReceiver<ShutdownMode>,
}

/// Run state shared between the handles and the consumer task.
///
/// The task puts its [`Consumer`] back into `consumer` and clears `running`
/// itself when it ends, so no caller has to be alive to observe the join.
struct Lifecycle<E> {
    consumer: Mutex<Option<Consumer<E>>>,
    running: watch::Sender<bool>,
    stop_requested: AtomicBool,
    lost: AtomicBool,
    runs: AtomicU64,
}

struct Shared<S: State, E: Event> {
    engine: Arc<Engine<S, E>>,
    sender: EventSender<E>,
    control: mpsc::UnboundedSender<ShutdownMode>,
    lifecycle: Arc<Lifecycle<E>>,
    /// Handle of the latest run, tagged with its run number.
    task: Mutex<Option<(u64, JoinHandle<()>)>>,
}

/// Machine whose single consumer is a spawned tokio task.
///
/// `fire` only enqueues. Transitions run on the task started by
/// [`start`](Self::start), one at a time, in queue order. Clones are handles
/// to the same instance; once every handle is dropped the task ends.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::StateMachineBuilder;
/// use switchyard::machine::ShutdownMode;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut builder = StateMachineBuilder::<&str, &str>::new();
/// builder.in_state("idle").on("go").goto("busy");
/// builder.in_state("busy").on("done").goto("idle");
///
/// let machine = builder
///     .with_initial_state("idle")
///     .build()
///     .unwrap()
///     .create_active_state_machine();
/// machine.start().unwrap();
/// machine.fire("go");
/// machine.wait_for_state(&"busy").await.unwrap();
///
/// machine.stop(ShutdownMode::Graceful).await.unwrap();
/// # }
/// ```
pub struct ActiveStateMachine<S: State, E: Event> {
    shared: Arc<Shared<S, E>>,
}

impl<S: State, E: Event> Clone for ActiveStateMachine<S, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State, E: Event> ActiveStateMachine<S, E> {
    pub(crate) fn new(definition: StateMachineDefinition<S, E>, config: MachineConfig) -> Self {
        let (sender, queue) = event_queue();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                engine: Arc::new(Engine::new(definition, config)),
                sender,
                control: control_tx,
                lifecycle: Arc::new(Lifecycle {
                    consumer: Mutex::new(Some(Consumer {
                        queue,
                        control: control_rx,
                    })),
                    running: watch::Sender::new(false),
                    stop_requested: AtomicBool::new(false),
                    lost: AtomicBool::new(false),
                    runs: AtomicU64::new(0),
                }),
                task: Mutex::new(None),
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

    pub fn current_state(&self) -> Option<S> {
        self.shared.engine.current_state()
    }

    pub fn is_running(&self) -> bool {
        *self.shared.lifecycle.running.borrow()
    }

    pub fn pending_events(&self) -> usize {
        self.shared.sender.pending()
    }

    pub fn add_extension(&self, extension: Arc<dyn Extension<S, E>>) {
        self.shared.engine.observers().add(extension);
    }

    pub fn clear_extensions(&self) {
        self.shared.engine.observers().clear();
    }

    /// Handlers run on the consumer task.
    pub fn on_transition_exception<F>(&self, handler: F)
    where
        F: Fn(&TransitionExceptionArgs<S, E>) + Send + Sync + 'static,
    {
        self.shared
            .engine
            .observers()
            .on_exception(Arc::new(handler));
    }

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

    /// Spawn the consumer task on the current tokio runtime.
    ///
    /// Has no effect while a consumer task is alive, including one that is
    /// still winding down after [`stop`](Self::stop).
    pub fn start(&self) -> Result<(), TaskError> {
        let runtime = Handle::try_current().map_err(|_| TaskError::NoRuntime)?;
        let lifecycle = &self.shared.lifecycle;
        let Some(consumer) = lifecycle.consumer.lock().take() else {
            if lifecycle.lost.load(Ordering::SeqCst) {
                return Err(TaskError::Lost);
            }
            return Ok(());
        };

        let run_number = lifecycle.runs.fetch_add(1, Ordering::SeqCst) + 1;
        lifecycle.running.send_replace(true);
        let info = self.shared.engine.info();
        self.shared
            .engine
            .observers()
            .each("started", |ext| ext.started(&info));

        let engine = Arc::clone(&self.shared.engine);
        let handle = runtime.spawn(run(engine, Arc::clone(lifecycle), consumer));
        *self.shared.task.lock() = Some((run_number, handle));
        Ok(())
    }

    /// Stop the consumer task and wait for it to finish.
    ///
    /// Only the first request of a run is delivered to the task; later calls
    /// wait for that one. Dropping the returned future does not withdraw the
    /// request: the task still stops and the machine can be started again.
    /// Events fired after the task has finished stay queued for the next
    /// start.
    pub async fn stop(&self, mode: ShutdownMode) -> Result<(), TaskError> {
        let lifecycle = &self.shared.lifecycle;
        let mut running = lifecycle.running.subscribe();
        if !*running.borrow_and_update() {
            return Ok(());
        }
        let run_number = lifecycle.runs.load(Ordering::SeqCst);

        if !lifecycle.stop_requested.swap(true, Ordering::SeqCst) {
            debug!(machine = %self.name(), ?mode, "stopping state machine");
            if self.shared.control.send(mode).is_err() {
                warn!(machine = %self.name(), "consumer task already gone");
            }
        }

        while *running.borrow_and_update() {
            if running.changed().await.is_err() {
                break;
            }
        }

        let handle = {
            let mut task = self.shared.task.lock();
            match task.take() {
                Some((number, handle)) if number == run_number => Some(handle),
                // A newer run owns the slot.
                other => {
                    *task = other;
                    None
                }
            }
        };
        match handle {
            Some(handle) => handle.await.map_err(TaskError::from),
            None => Ok(()),
        }
    }

    /// Wait until the current state equals `target`.
    pub async fn wait_for_state(&self, target: &S) -> Result<(), watch::error::RecvError> {
        let mut rx = self.shared.engine.subscribe();
        while (*rx.borrow_and_update()).as_ref() != Some(target) {
            rx.changed().await?;
        }
        Ok(())
    }

    pub fn fire(&self, event: E) {
        self.fire_with(event, Payload::none());
    }

    /// Enqueue `event`. If the consumer task was lost the event is dropped
    /// with a warning.
    pub fn fire_with(&self, event: E, payload: Payload) {
        let info = self.shared.engine.info();
        self.shared.engine.observers().each("event_queued", |ext| {
            ext.event_queued(&info, &event, &payload)
        });
        if !self.shared.sender.send(event, payload) {
            warn!(machine = %self.name(), "event dropped, consumer task lost");
        }
    }

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
        if !self.shared.sender.send_priority(event, payload) {
            warn!(machine = %self.name(), "event dropped, consumer task lost");
        }
    }
}

/// Clears the running flag when the consumer task ends, however it ends.
/// A task that ends without handing its consumer back marks the machine lost.
struct RunGuard<E> {
    lifecycle: Arc<Lifecycle<E>>,
}

impl<E> Drop for RunGuard<E> {
    fn drop(&mut self) {
        if self.lifecycle.consumer.lock().is_none() {
            self.lifecycle.lost.store(true, Ordering::SeqCst);
        }
        self.lifecycle.stop_requested.store(false, Ordering::SeqCst);
        self.lifecycle.running.send_replace(false);
    }
}

/// Consumer loop. Shutdown requests take precedence over queued events.
async fn run<S: State, E: Event>(
    engine: Arc<Engine<S, E>>,
    lifecycle: Arc<Lifecycle<E>>,
    mut consumer: Consumer<E>,
) {
    let _guard = RunGuard {
        lifecycle: Arc::clone(&lifecycle),
    };
    engine.enter_initial_state();
    loop {
        tokio::select! {
            biased;
            mode = consumer.control.recv() => {
                match mode {
                    Some(ShutdownMode::Graceful) => {
                        while let Some(queued) = consumer.queue.try_next() {
                            engine.process(queued.event, queued.payload);
                        }
                    }
                    Some(ShutdownMode::Immediate) => {
                        let dropped = consumer.queue.discard();
                        if dropped > 0 {
                            debug!(machine = %engine.name(), dropped, "discarded queued events");
                        }
                    }
                    None => {}
                }
                break;
            }
            queued = consumer.queue.next() => {
                let Some(queued) = queued else { break };
                engine.process(queued.event, queued.payload);
            }
        }
    }

    *lifecycle.consumer.lock() = Some(consumer);
    let info = engine.info();
    engine.observers().each("stopped", |ext| ext.stopped(&info));
}

impl<S: State, E: Event> StateMachine<S, E> for ActiveStateMachine<S, E> {
    fn id(&self) -> Uuid {
        ActiveStateMachine::id(self)
    }

    fn current_state(&self) -> Option<S> {
        ActiveStateMachine::current_state(self)
    }

    fn is_running(&self) -> bool {
        ActiveStateMachine::is_running(self)
    }

    fn pending_events(&self) -> usize {
        ActiveStateMachine::pending_events(self)
    }

    fn add_extension(&self, extension: Arc<dyn Extension<S, E>>) {
        ActiveStateMachine::add_extension(self, extension)
    }

    fn fire_with(&self, event: E, payload: Payload) {
        ActiveStateMachine::fire_with(self, event, payload)
    }

    fn fire_priority_with(&self, event: E, payload: Payload) {
        ActiveStateMachine::fire_priority_with(self, event, payload)
    }
}
