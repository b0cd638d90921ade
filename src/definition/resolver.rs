//! Transition lookup.

use super::{StateMachineDefinition, TransitionDefinition, TransitionKind};
use crate::core::{Event, State};

/// Outcome of looking up a (state, event) pair.
pub enum Resolution<'a, S, E> {
    /// Nothing is declared for the pair. The event is dropped.
    NoTransition,
    /// Exactly one rule applies.
    Transition(&'a TransitionDefinition<S, E>),
}

impl<'a, S: State, E: Event> Resolution<'a, S, E> {
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition(_))
    }

    pub fn transition(&self) -> Option<&'a TransitionDefinition<S, E>> {
        match self {
            Self::Transition(transition) => Some(*transition),
            Self::NoTransition => None,
        }
    }

    pub fn kind(&self) -> Option<TransitionKind> {
        self.transition().map(TransitionDefinition::kind)
    }
}

/// Exact match on (state, event). No wildcard or parent-state fallback.
pub(super) fn resolve<'a, S: State, E: Event>(
    definition: &'a StateMachineDefinition<S, E>,
    state: &S,
    event: &E,
) -> Resolution<'a, S, E> {
    match definition
        .state(state)
        .and_then(|definition| definition.transition(event))
    {
        Some(transition) => Resolution::Transition(transition),
        None => Resolution::NoTransition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateMachineBuilder;

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    enum Light {
        Red,
        Green,
    }

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    enum Signal {
        Go,
        Stop,
        Blink,
    }

    fn definition() -> StateMachineDefinition<Light, Signal> {
        let mut builder = StateMachineBuilder::new();
        builder.in_state(Light::Red).on(Signal::Go).goto(Light::Green);
        builder
            .in_state(Light::Green)
            .on(Signal::Stop)
            .goto(Light::Red)
            .on(Signal::Blink)
            .execute(|| {});
        builder.with_initial_state(Light::Red).build().unwrap()
    }

    #[test]
    fn resolves_exact_pair() {
        let definition = definition();
        let resolution = definition.resolve(&Light::Red, &Signal::Go);

        assert!(resolution.is_transition());
        let transition = resolution.transition().unwrap();
        assert_eq!(transition.source(), &Light::Red);
        assert_eq!(transition.event(), &Signal::Go);
        assert_eq!(transition.target(), Some(&Light::Green));
        assert_eq!(resolution.kind(), Some(TransitionKind::Normal));
    }

    #[test]
    fn unknown_pair_is_no_transition() {
        let definition = definition();

        assert!(!definition.resolve(&Light::Red, &Signal::Stop).is_transition());
        assert!(definition
            .resolve(&Light::Red, &Signal::Blink)
            .kind()
            .is_none());
    }

    #[test]
    fn internal_transition_is_classified() {
        let definition = definition();

        assert_eq!(
            definition.resolve(&Light::Green, &Signal::Blink).kind(),
            Some(TransitionKind::Internal)
        );
    }
}
