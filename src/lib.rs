//! Switchyard: a fault-containing finite state machine engine
//!
//! A machine is declared once through a fluent builder, validated into an
//! immutable [`StateMachineDefinition`], and then instantiated any number of
//! times. Each instance executes fired events one at a time from its own
//! queue: exit action, transition actions, entry action. A failing or
//! panicking action is reported to the registered handlers and extensions
//! and the transition still reaches its declared target.
//!
//! # Core Concepts
//!
//! - **Builder**: `in_state(..).on(..).goto(..).execute(..)` accumulates states
//!   and transitions; `build()` reports every configuration error at once
//! - **Definition**: the validated, shareable transition graph
//! - **Machines**: [`PassiveStateMachine`] runs events on the firing thread,
//!   [`ActiveStateMachine`] runs them on a tokio task
//! - **Extensions**: observers notified of every lifecycle step
//!
//! # Example
//!
//! ```rust
//! use switchyard::{for_machine, Payload};
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Door {
//!     Closed,
//!     Open,
//! }
//!
//! let opened_by = Arc::new(Mutex::new(None));
//! let sink = Arc::clone(&opened_by);
//!
//! let mut builder = for_machine::<Door, &str>();
//! builder
//!     .in_state(Door::Closed)
//!     .on("open")
//!     .goto(Door::Open)
//!     .execute_with(move |who: &String| *sink.lock() = Some(who.clone()));
//! builder.in_state(Door::Open).on("close").goto(Door::Closed);
//!
//! let definition = builder.with_initial_state(Door::Closed).build().unwrap();
//! let machine = definition.create_passive_state_machine();
//! machine.start();
//! machine.fire_with("open", Payload::new("alice".to_string()));
//!
//! assert_eq!(machine.current_state(), Some(Door::Open));
//! assert_eq!(opened_by.lock().as_deref(), Some("alice"));
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod definition;
pub mod engine;
pub mod machine;

// Re-export commonly used types
pub use builder::{for_machine, BuildError, BuildErrors, StateMachineBuilder};
pub use config::{DeclinedPolicy, MachineConfig};
pub use core::{ActionError, ActionStage, Event, Guard, Payload, State};
pub use definition::{StateMachineDefinition, TransitionKind};
pub use engine::{Extension, MachineInfo, TransitionExceptionArgs};
pub use machine::{ActiveStateMachine, PassiveStateMachine, ShutdownMode, StateMachine, TaskError};
