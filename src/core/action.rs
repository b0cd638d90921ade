//! User actions and their failure type.
//!
//! Actions are side-effecting callbacks attached to transitions and to state
//! entry/exit. They report failure through [`ActionResult`]; the engine turns
//! any failure into a notification instead of letting it escape.

use super::payload::Payload;
use std::any::{type_name, Any};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a single action invocation.
pub type ActionResult = Result<(), ActionError>;

/// Failure raised by a user callback.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    /// The callback returned an error.
    #[error("action failed: {0}")]
    Failed(Arc<dyn Error + Send + Sync>),

    /// The callback panicked.
    #[error("action panicked: {0}")]
    Panicked(String),

    /// A payload-typed callback received no payload or one of another type.
    #[error("payload type mismatch: expected {expected}, found {found}")]
    PayloadMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ActionError {
    pub fn failed<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Failed(Arc::new(error))
    }

    /// Borrow the exact error value returned by the callback.
    pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Failed(error) => error.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub(crate) fn from_panic(panic: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panicked(message)
    }
}

/// Conversion from a callback's return value into an [`ActionResult`].
///
/// Implemented for `()` and for `Result<(), E>` so closures can be written
/// either way.
pub trait IntoActionResult {
    fn into_action_result(self) -> ActionResult;
}

impl IntoActionResult for () {
    fn into_action_result(self) -> ActionResult {
        Ok(())
    }
}

impl<E> IntoActionResult for Result<(), E>
where
    E: Error + Send + Sync + 'static,
{
    fn into_action_result(self) -> ActionResult {
        self.map_err(ActionError::failed)
    }
}

/// Which part of a transition a callback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStage {
    Guard,
    Exit,
    Transition,
    Entry,
}

impl fmt::Display for ActionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Guard => "guard",
            Self::Exit => "exit",
            Self::Transition => "transition",
            Self::Entry => "entry",
        };
        f.write_str(name)
    }
}

type NoPayloadFn = Arc<dyn Fn() -> ActionResult + Send + Sync>;
type PayloadFn = Arc<dyn Fn(&Payload) -> ActionResult + Send + Sync>;

/// A callback, tagged by whether it consumes the event payload.
#[derive(Clone)]
pub enum Action {
    NoPayload(NoPayloadFn),
    TypedPayload(PayloadFn),
}

impl Action {
    /// Wrap a payload-agnostic callback.
    pub fn new<F, R>(action: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoActionResult,
    {
        Self::NoPayload(Arc::new(move || action().into_action_result()))
    }

    /// Wrap a callback that consumes a payload of type `T`.
    pub fn typed<T, F, R>(action: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoActionResult,
    {
        Self::TypedPayload(Arc::new(move |payload: &Payload| {
            match payload.get::<T>() {
                Some(value) => action(value).into_action_result(),
                None => Err(ActionError::PayloadMismatch {
                    expected: type_name::<T>(),
                    found: payload.type_name(),
                }),
            }
        }))
    }

    pub fn accepts_payload(&self) -> bool {
        matches!(self, Self::TypedPayload(_))
    }

    /// Run the callback. Panics are not caught here.
    pub fn invoke(&self, payload: &Payload) -> ActionResult {
        match self {
            Self::NoPayload(action) => action(),
            Self::TypedPayload(action) => action(payload),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPayload(_) => f.write_str("Action::NoPayload"),
            Self::TypedPayload(_) => f.write_str("Action::TypedPayload"),
        }
    }
}
