use super::*;
use crate::detection::{DetectionGate, DetectionSignal, DetectionThresholds};
use crate::inference::DetectionResponse;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const COOLDOWN: Duration = Duration::from_millis(2000);

fn machine_with_target(target: char) -> PracticeStateMachine<StdRng> {
    PracticeStateMachine::with_target(COOLDOWN, StdRng::seed_from_u64(7), target)
}

fn signal(letter: char, confidence: f64) -> DetectionSignal {
    DetectionGate::new(DetectionThresholds::default()).apply(&DetectionResponse {
        letter: Some(letter),
        confidence,
    })
}

/// Score the current target and let the cooldown run out
fn complete_turn(machine: &mut PracticeStateMachine<StdRng>) -> PracticeOutcome {
    let target = machine.target();
    let outcome = machine.on_signal(&signal(target, 0.9));
    assert!(machine.on_cooldown_expired());
    outcome
}

#[test]
fn test_new_game_starts_clean() {
    let machine = PracticeStateMachine::new(COOLDOWN, StdRng::seed_from_u64(1));
    let state = machine.state();

    assert!(ALPHABET.contains(&state.target_letter));
    assert!(state.completed_letters.is_empty());
    assert_eq!(state.progress_count, 0);
    assert!(!state.cooldown_active);
    assert_eq!(state.last_scored_letter, None);
    assert_eq!(machine.feedback(), Feedback::None);
}

#[test]
fn test_matching_target_scores() {
    let mut machine = machine_with_target('A');

    let outcome = machine.on_signal(&signal('A', 0.9));

    let state = machine.state();
    match outcome {
        PracticeOutcome::Scored {
            letter,
            next_target,
            progress,
            cycle_completed,
        } => {
            assert_eq!(letter, 'A');
            assert_ne!(next_target, 'A');
            assert_eq!(next_target, state.target_letter);
            assert_eq!(progress, 1);
            assert!(!cycle_completed);
        }
        other => panic!("Expected a score, got {:?}", other),
    }

    assert_eq!(state.progress_count, 1);
    assert_eq!(state.completed_letters.iter().collect::<Vec<_>>(), vec![&'A']);
    assert!(state.cooldown_active);
    assert_eq!(state.last_scored_letter, Some('A'));
    assert!(machine.feedback().is_positive());
}

#[test]
fn test_wrong_letter_gives_corrective_feedback() {
    let mut machine = machine_with_target('A');

    let outcome = machine.on_signal(&signal('B', 0.95));

    assert_eq!(
        outcome,
        PracticeOutcome::Mismatch {
            detected: 'B',
            target: 'A'
        }
    );
    assert_eq!(machine.state().progress_count, 0);
    assert_eq!(machine.target(), 'A');
    assert_eq!(
        machine.feedback().text().unwrap(),
        "That looks like B. Try signing A."
    );
}

#[test]
fn test_low_confidence_never_scores() {
    let mut machine = machine_with_target('A');

    let low = signal('A', 0.5);
    assert_eq!(low.letter, None);
    assert_eq!(machine.on_signal(&low), PracticeOutcome::Ignored);
    assert_eq!(machine.state().progress_count, 0);
    assert_eq!(machine.target(), 'A');
}

#[test]
fn test_repeated_signals_during_cooldown_score_once() {
    let mut machine = machine_with_target('A');

    assert!(matches!(
        machine.on_signal(&signal('A', 0.9)),
        PracticeOutcome::Scored { .. }
    ));

    let next_target = machine.target();
    for _ in 0..5 {
        assert_eq!(machine.on_signal(&signal('A', 0.9)), PracticeOutcome::Debounced);
        assert_eq!(
            machine.on_signal(&signal(next_target, 0.9)),
            PracticeOutcome::Debounced
        );
    }

    assert_eq!(machine.state().progress_count, 1);
    assert!(machine.feedback().is_positive());
}

#[test]
fn test_cooldown_expiry_clears_debounce_state() {
    let mut machine = machine_with_target('A');
    machine.on_signal(&signal('A', 0.9));

    assert!(machine.on_cooldown_expired());
    assert!(!machine.on_cooldown_expired());

    let state = machine.state();
    assert!(!state.cooldown_active);
    assert_eq!(state.last_scored_letter, None);
    assert_eq!(machine.feedback(), Feedback::None);

    let target = machine.target();
    assert!(matches!(
        machine.on_signal(&signal(target, 0.9)),
        PracticeOutcome::Scored { progress: 2, .. }
    ));
}

#[test]
fn test_full_alphabet_resets_completed_set() {
    let mut machine = machine_with_target('A');

    for turn in 1..26 {
        assert!(matches!(
            complete_turn(&mut machine),
            PracticeOutcome::Scored { progress, cycle_completed: false, .. } if progress == turn
        ));
        assert_eq!(machine.state().completed_letters.len(), turn);
    }

    let last = machine.target();
    assert!(!machine.state().completed_letters.contains(&last));

    match machine.on_signal(&signal(last, 0.9)) {
        PracticeOutcome::Scored {
            letter,
            progress,
            cycle_completed,
            ..
        } => {
            assert_eq!(letter, last);
            assert_eq!(progress, 0);
            assert!(cycle_completed);
        }
        other => panic!("Expected the final score, got {:?}", other),
    }

    let state = machine.state();
    assert!(state.completed_letters.is_empty());
    assert_eq!(state.progress_count, 0);
    assert!(ALPHABET.contains(&state.target_letter));
    assert!(matches!(machine.feedback(), Feedback::AlphabetComplete { .. }));
}

#[test]
fn test_completed_letters_only_grow_within_a_cycle() {
    let mut machine = machine_with_target('M');
    let mut previous = machine.state().completed_letters.clone();

    for _ in 0..40 {
        complete_turn(&mut machine);
        let current = machine.state().completed_letters.clone();

        if current.is_empty() {
            assert_eq!(previous.len(), 25);
        } else {
            assert!(current.is_superset(&previous));
            assert_eq!(current.len(), previous.len() + 1);
        }
        assert_eq!(machine.state().progress_count, current.len());
        previous = current;
    }
}

#[test]
fn test_skip_target_picks_a_different_letter() {
    let mut machine = machine_with_target('A');
    machine.on_signal(&signal('B', 0.9));

    let next = machine.skip_target();

    assert_ne!(next, 'A');
    assert_eq!(machine.target(), next);
    assert_eq!(machine.state().last_scored_letter, None);
    assert_eq!(machine.feedback(), Feedback::None);
    assert_eq!(machine.state().progress_count, 0);
}

#[test]
fn test_set_target_resets_last_scored_letter() {
    let mut machine = machine_with_target('A');
    machine.on_signal(&signal('A', 0.9));
    assert_eq!(machine.state().last_scored_letter, Some('A'));

    assert!(machine.set_target('c'));
    assert_eq!(machine.target(), 'C');
    assert_eq!(machine.state().last_scored_letter, None);

    assert!(!machine.set_target('7'));
    assert_eq!(machine.target(), 'C');
}

#[test]
fn test_same_seed_same_targets() {
    let mut first = PracticeStateMachine::new(COOLDOWN, StdRng::seed_from_u64(42));
    let mut second = PracticeStateMachine::new(COOLDOWN, StdRng::seed_from_u64(42));

    for _ in 0..10 {
        assert_eq!(first.target(), second.target());
        complete_turn(&mut first);
        complete_turn(&mut second);
    }
}
