//! Identifier traits for states and events.
//!
//! States and events are opaque, comparable identifiers. Any type that is
//! cloneable, hashable and thread-safe qualifies, so plain integers, strings
//! and fieldless enums all work without extra boilerplate.

use std::fmt::Debug;
use std::hash::Hash;

/// Identifier of a state in the transition graph.
///
/// Blanket-implemented for every type meeting the bounds.
///
/// # Example
///
/// ```rust
/// use switchyard::core::State;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum Door {
///     Open,
///     Closed,
/// }
///
/// fn assert_state<S: State>(_: &S) {}
///
/// assert_state(&Door::Open);
/// assert_state(&1_i32);
/// ```
pub trait State: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> State for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Identifier of an event that can be fired onto a machine.
///
/// Blanket-implemented for every type meeting the bounds.
pub trait Event: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> Event for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    enum TestState {
        Initial,
        Complete,
    }

    fn is_state<S: State>() -> bool {
        true
    }

    fn is_event<E: Event>() -> bool {
        true
    }

    #[test]
    fn integers_and_strings_are_identifiers() {
        assert!(is_state::<i32>());
        assert!(is_state::<String>());
        assert!(is_event::<u8>());
        assert!(is_event::<&'static str>());
    }

    #[test]
    fn enums_are_identifiers() {
        assert!(is_state::<TestState>());

        let mut seen = HashSet::new();
        seen.insert(TestState::Initial);
        seen.insert(TestState::Complete);
        seen.insert(TestState::Initial);
        assert_eq!(seen.len(), 2);
    }
}
