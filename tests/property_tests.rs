//! Property-based tests for machine execution.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated event sequences.

use chrono::Utc;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use switchyard::core::{StateHistory, StateTransition};
use switchyard::engine::HistoryRecorder;
use switchyard::{for_machine, PassiveStateMachine};

const STATES: u8 = 4;

#[derive(Debug, thiserror::Error)]
#[error("step {0} failed")]
struct StepFailed(usize);

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Succeed,
    Fail,
    Panic,
}

prop_compose! {
    fn arbitrary_outcome()(variant in 0..3u8) -> Outcome {
        match variant {
            0 => Outcome::Succeed,
            1 => Outcome::Fail,
            _ => Outcome::Panic,
        }
    }
}

/// Every state has a transition to state `e` on event `e`.
fn complete_graph() -> PassiveStateMachine<u8, u8> {
    let mut builder = for_machine::<u8, u8>();
    for state in 0..STATES {
        let mut config = builder.in_state(state).on(0).goto(0);
        for event in 1..STATES {
            config = config.on(event).goto(event);
        }
    }
    builder
        .with_initial_state(0)
        .build()
        .unwrap()
        .create_passive_state_machine()
}

proptest! {
    #[test]
    fn events_execute_in_fire_order(
        events in prop::collection::vec(0..STATES, 0..20)
    ) {
        let machine = complete_graph();
        let recorder = Arc::new(HistoryRecorder::<u8, u8>::new());
        machine.add_extension(recorder.clone());
        machine.start();

        for event in &events {
            machine.fire(*event);
        }

        let history = recorder.snapshot();
        let mut expected = vec![0];
        expected.extend(events.iter().copied());
        let path: Vec<u8> = history.get_path().into_iter().copied().collect();
        prop_assert_eq!(path, expected);
        prop_assert_eq!(machine.current_state(), Some(*events.last().unwrap_or(&0)));
        prop_assert_eq!(machine.pending_events(), 0);
    }

    #[test]
    fn internal_transitions_never_change_state(
        initial in 0..STATES,
        events in prop::collection::vec(0..STATES, 1..20)
    ) {
        let executed = Arc::new(AtomicUsize::new(0));
        let exits = Arc::new(AtomicUsize::new(0));
        let mut builder = for_machine::<u8, u8>();
        for state in 0..STATES {
            let exit_counter = Arc::clone(&exits);
            let mut config = builder
                .in_state(state)
                .execute_on_exit(move || {
                    exit_counter.fetch_add(1, Ordering::SeqCst);
                })
                .on(0);
            for event in 1..STATES {
                let counter = Arc::clone(&executed);
                config = config
                    .execute(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .on(event);
            }
            let counter = Arc::clone(&executed);
            config.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        let machine = builder
            .with_initial_state(initial)
            .build()
            .unwrap()
            .create_passive_state_machine();
        machine.start();

        for event in &events {
            machine.fire(*event);
            prop_assert_eq!(machine.current_state(), Some(initial));
        }

        prop_assert_eq!(executed.load(Ordering::SeqCst), events.len());
        prop_assert_eq!(exits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_actions_still_reach_target(
        outcomes in prop::collection::vec(arbitrary_outcome(), 1..8)
    ) {
        let steps = outcomes.len();
        let mut builder = for_machine::<usize, ()>();
        for (step, outcome) in outcomes.iter().copied().enumerate() {
            builder
                .in_state(step)
                .on(())
                .goto(step + 1)
                .execute(move || match outcome {
                    Outcome::Succeed => Ok(()),
                    Outcome::Fail => Err(StepFailed(step)),
                    Outcome::Panic => panic!("step {step} panicked"),
                });
        }
        builder.in_state(steps);
        let machine = builder
            .with_initial_state(0)
            .build()
            .unwrap()
            .create_passive_state_machine();

        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        machine.on_transition_exception(move |args| sink.lock().push(args.state));
        machine.start();

        for _ in 0..steps {
            machine.fire(());
        }

        let expected: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| !matches!(outcome, Outcome::Succeed))
            .map(|(step, _)| step)
            .collect();
        prop_assert_eq!(machine.current_state(), Some(steps));
        prop_assert_eq!(failures.lock().clone(), expected);
    }

    #[test]
    fn priority_events_precede_normal_events(
        fired in prop::collection::vec((any::<bool>(), 0..100u8), 0..20)
    ) {
        let mut builder = for_machine::<u8, u8>();
        builder.in_state(0);
        let machine = builder
            .with_initial_state(0)
            .build()
            .unwrap()
            .create_passive_state_machine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        machine.on_transition_declined(move |context| sink.lock().push(context.event));

        for (priority, event) in &fired {
            if *priority {
                machine.fire_priority(*event);
            } else {
                machine.fire(*event);
            }
        }
        machine.start();

        let mut expected: Vec<u8> = fired.iter().filter(|(p, _)| *p).map(|(_, e)| *e).collect();
        expected.extend(fired.iter().filter(|(p, _)| !*p).map(|(_, e)| *e));
        prop_assert_eq!(seen.lock().clone(), expected);
    }

    #[test]
    fn history_roundtrip_serialization(
        path in prop::collection::vec(0..STATES, 0..8)
    ) {
        let mut history = StateHistory::<u8, u8>::new();
        let mut from = None;
        for state in &path {
            history = history.record(StateTransition {
                from,
                to: *state,
                event: from.map(|_| *state),
                timestamp: Utc::now(),
            });
            from = Some(*state);
        }

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory<u8, u8> = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(history.transitions(), deserialized.transitions());
    }
}
