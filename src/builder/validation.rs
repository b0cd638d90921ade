//! Structural validation of a definition under construction.
//!
//! Uses `Validation` to accumulate every problem instead of stopping at the
//! first one.

use crate::builder::error::BuildError;
use crate::builder::machine::StateRecord;
use crate::core::{Event, State};
use std::collections::{HashMap, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<BuildError>>;

fn ensure(condition: bool, error: impl FnOnce() -> BuildError) -> Check {
    if condition {
        Validation::success(())
    } else {
        Validation::fail(error())
    }
}

fn name<T: std::fmt::Debug>(value: &T) -> String {
    format!("{:?}", value)
}

fn check_initial<S: State>(initial: Option<&S>, index: &HashMap<S, usize>) -> Check {
    match initial {
        None => Validation::fail(BuildError::MissingInitialState),
        Some(state) => ensure(index.contains_key(state), || {
            BuildError::UndefinedInitialState { state: name(state) }
        }),
    }
}

fn check_state<S: State, E: Event>(
    id: &S,
    record: &StateRecord<S, E>,
    index: &HashMap<S, usize>,
) -> Vec<Check> {
    let mut checks = vec![
        ensure(record.entry.len() <= 1, || BuildError::DuplicateEntryAction {
            state: name(id),
        }),
        ensure(record.exit.len() <= 1, || BuildError::DuplicateExitAction {
            state: name(id),
        }),
    ];

    let mut seen: HashSet<&E> = HashSet::new();
    for transition in &record.transitions {
        let event = &transition.event;

        // Report a duplicated pair once, however often it repeats.
        let first = seen.insert(event);
        let repeated = record
            .transitions
            .iter()
            .filter(|t| &t.event == event)
            .count()
            > 1;
        if first {
            checks.push(ensure(!repeated, || BuildError::DuplicateTransition {
                state: name(id),
                event: name(event),
            }));
        }

        checks.push(ensure(transition.targets.len() <= 1, || {
            BuildError::DuplicateTarget {
                state: name(id),
                event: name(event),
            }
        }));
        checks.push(ensure(transition.guards.len() <= 1, || {
            BuildError::DuplicateGuard {
                state: name(id),
                event: name(event),
            }
        }));
        for target in &transition.targets {
            checks.push(ensure(index.contains_key(target), || {
                BuildError::UndefinedTarget {
                    from: name(id),
                    event: name(event),
                    target: name(target),
                }
            }));
        }
    }

    checks
}

/// Validate the whole definition.
pub(crate) fn validate<S: State, E: Event>(
    states: &[(S, StateRecord<S, E>)],
    index: &HashMap<S, usize>,
    initial: Option<&S>,
) -> Validation<(), NonEmptyVec<BuildError>> {
    let mut checks = vec![check_initial(initial, index)];
    for (id, record) in states {
        checks.extend(check_state(id, record, index));
    }

    Validation::all_vec(checks).map(|_| ())
}
