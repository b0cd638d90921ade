//! Guard predicates for controlling state transitions.
//!
//! A guard decides, from the fired payload, whether a resolved transition
//! may run. A guard that rejects makes the event declined.

use super::action::{ActionError, IntoActionResult};
use super::payload::Payload;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&Payload) -> Result<bool, ActionError> + Send + Sync>;

/// Predicate evaluated before a transition executes.
///
/// # Example
///
/// ```rust
/// use switchyard::core::{Guard, Payload};
///
/// let only_positive = Guard::typed(|amount: &i64| *amount > 0);
///
/// assert!(only_positive.check(&Payload::new(5_i64)).unwrap());
/// assert!(!only_positive.check(&Payload::new(-1_i64)).unwrap());
/// assert!(only_positive.check(&Payload::none()).is_err());
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Predicate,
}

impl Guard {
    /// Create a guard over the raw payload.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Payload) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(move |payload: &Payload| Ok(predicate(payload))),
        }
    }

    /// Create a guard over a payload of type `T`.
    ///
    /// Evaluating it against an absent or differently-typed payload is an
    /// error, not a rejection.
    pub fn typed<T, F>(predicate: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(move |payload: &Payload| match payload.get::<T>() {
                Some(value) => Ok(predicate(value)),
                None => Err(ActionError::PayloadMismatch {
                    expected: type_name::<T>(),
                    found: payload.type_name(),
                }),
            }),
        }
    }

    /// Create a guard from a fallible check.
    pub fn fallible<F, R>(predicate: F) -> Self
    where
        F: Fn(&Payload) -> Result<bool, R> + Send + Sync + 'static,
        Result<(), R>: IntoActionResult,
    {
        Guard {
            predicate: Arc::new(move |payload: &Payload| match predicate(payload) {
                Ok(allowed) => Ok(allowed),
                Err(error) => Err::<(), R>(error)
                    .into_action_result()
                    .map(|_| false),
            }),
        }
    }

    /// Evaluate the guard. Panics are not caught here.
    pub fn check(&self, payload: &Payload) -> Result<bool, ActionError> {
        (self.predicate)(payload)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard")
    }
}
