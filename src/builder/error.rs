//! Configuration errors reported by the definition builder.

use thiserror::Error;

/// A single configuration problem found while building a definition.
///
/// Identifiers are rendered with their `Debug` representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .with_initial_state(state) before .build()")]
    MissingInitialState,

    #[error("Initial state {state} is not defined. Configure it with .in_state(state)")]
    UndefinedInitialState { state: String },

    #[error("Transition from {from} on {event} targets undefined state {target}")]
    UndefinedTarget {
        from: String,
        event: String,
        target: String,
    },

    #[error("Transition from {state} on {event} is defined more than once")]
    DuplicateTransition { state: String, event: String },

    #[error("Transition from {state} on {event} has more than one target")]
    DuplicateTarget { state: String, event: String },

    #[error("Transition from {state} on {event} has more than one guard")]
    DuplicateGuard { state: String, event: String },

    #[error("State {state} has more than one entry action")]
    DuplicateEntryAction { state: String },

    #[error("State {state} has more than one exit action")]
    DuplicateExitAction { state: String },
}

/// Every configuration problem found by one call to `build()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid state machine definition: {}", join(.0))]
pub struct BuildErrors(Vec<BuildError>);

impl BuildErrors {
    pub(crate) fn new(errors: Vec<BuildError>) -> Self {
        Self(errors)
    }

    pub fn errors(&self) -> &[BuildError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildError> {
        self.0.iter()
    }

    pub fn contains(&self, error: &BuildError) -> bool {
        self.0.contains(error)
    }
}

impl From<BuildError> for BuildErrors {
    fn from(error: BuildError) -> Self {
        Self(vec![error])
    }
}

fn join(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_error() {
        let errors = BuildErrors::new(vec![
            BuildError::MissingInitialState,
            BuildError::DuplicateEntryAction {
                state: "1".to_string(),
            },
        ]);

        let rendered = errors.to_string();
        assert!(rendered.starts_with("invalid state machine definition: "));
        assert!(rendered.contains("Initial state not specified"));
        assert!(rendered.contains("State 1 has more than one entry action"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn single_error_converts() {
        let errors: BuildErrors = BuildError::MissingInitialState.into();
        assert!(errors.contains(&BuildError::MissingInitialState));
        assert!(!errors.is_empty());
    }
}
