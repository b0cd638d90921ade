//! Fluent builder for state machine definitions.
//!
//! The builder accumulates per-state configuration and produces an
//! immutable [`StateMachineDefinition`](crate::definition::StateMachineDefinition).
//! The engine never sees builder internals.

pub mod error;
pub mod machine;
pub mod state;
pub mod transition;
mod validation;

pub use error::{BuildError, BuildErrors};
pub use machine::{for_machine, StateMachineBuilder};
pub use state::StateConfig;
pub use transition::TransitionConfig;
