//! Core value types shared by the builder, the definition model and the
//! engine:
//! - state and event identifiers
//! - payloads carried by fired events
//! - actions and guards attached to transitions
//! - history of state switches

mod action;
mod guard;
mod history;
mod payload;
mod state;

pub use action::{Action, ActionError, ActionResult, ActionStage, IntoActionResult};
pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use payload::Payload;
pub use state::{Event, State};
