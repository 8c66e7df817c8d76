use super::state::{is_practice_letter, Feedback, PracticeState, ALPHABET};
use crate::detection::DetectionSignal;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, info};

/// What a detection signal did to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeOutcome {
    /// No letter in the signal
    Ignored,
    /// A repeat of a scored letter or a signal during cooldown
    Debounced,
    Scored {
        letter: char,
        next_target: char,
        progress: usize,
        cycle_completed: bool,
    },
    Mismatch {
        detected: char,
        target: char,
    },
}

/// Turn-based letter practice: match the target, cool down, repeat
///
/// Owns [`PracticeState`]; every mutation goes through the methods here.
/// The cooldown itself is timed by the caller, which reports expiry through
/// [`PracticeStateMachine::on_cooldown_expired`].
pub struct PracticeStateMachine<R: Rng = StdRng> {
    state: PracticeState,
    feedback: Feedback,
    cooldown: Duration,
    rng: R,
}

impl PracticeStateMachine<StdRng> {
    pub fn from_entropy(cooldown: Duration) -> Self {
        Self::new(cooldown, StdRng::from_entropy())
    }
}

impl<R: Rng> PracticeStateMachine<R> {
    /// Start a fresh game with a random target
    pub fn new(cooldown: Duration, mut rng: R) -> Self {
        let target = pick(&ALPHABET, &mut rng);
        Self::with_target(cooldown, rng, target)
    }

    pub fn with_target(cooldown: Duration, rng: R, target: char) -> Self {
        Self {
            state: PracticeState::new(target),
            feedback: Feedback::None,
            cooldown,
            rng,
        }
    }

    pub fn state(&self) -> &PracticeState {
        &self.state
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    pub fn target(&self) -> char {
        self.state.target_letter
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn on_signal(&mut self, signal: &DetectionSignal) -> PracticeOutcome {
        let letter = match signal.letter {
            Some(letter) => letter,
            None => return PracticeOutcome::Ignored,
        };

        let target = self.state.target_letter;

        if self.state.cooldown_active {
            if letter == target || Some(letter) == self.state.last_scored_letter {
                return PracticeOutcome::Debounced;
            }
            return self.mismatch(letter, target);
        }

        if letter != target {
            return self.mismatch(letter, target);
        }

        if Some(letter) == self.state.last_scored_letter {
            return PracticeOutcome::Debounced;
        }

        self.score(letter)
    }

    /// End the cooldown window; returns false if none was running
    pub fn on_cooldown_expired(&mut self) -> bool {
        if !self.state.cooldown_active {
            return false;
        }

        self.state.cooldown_active = false;
        self.state.last_scored_letter = None;
        self.feedback = Feedback::None;
        debug!("Cooldown over, target is {}", self.state.target_letter);
        true
    }

    /// Move on to a different random letter without scoring
    pub fn skip_target(&mut self) -> char {
        let current = self.state.target_letter;
        let mut candidates: Vec<char> = self
            .state
            .remaining()
            .into_iter()
            .filter(|letter| *letter != current)
            .collect();
        if candidates.is_empty() {
            candidates = ALPHABET.iter().copied().filter(|l| *l != current).collect();
        }

        let next = pick(&candidates, &mut self.rng);
        self.change_target(next);
        next
    }

    /// Practice a specific letter; non-letters are rejected
    pub fn set_target(&mut self, letter: char) -> bool {
        let letter = letter.to_ascii_uppercase();
        if !is_practice_letter(letter) {
            return false;
        }
        self.change_target(letter);
        true
    }

    fn change_target(&mut self, letter: char) {
        self.state.target_letter = letter;
        self.state.last_scored_letter = None;
        self.feedback = Feedback::None;
        info!("Practice target set to {}", letter);
    }

    fn mismatch(&mut self, detected: char, target: char) -> PracticeOutcome {
        self.feedback = Feedback::TryAgain { detected, target };
        PracticeOutcome::Mismatch { detected, target }
    }

    fn score(&mut self, letter: char) -> PracticeOutcome {
        self.state.completed_letters.insert(letter);
        self.state.last_scored_letter = Some(letter);

        let remaining = self.state.remaining();
        let cycle_completed = remaining.is_empty();

        let next_target = if cycle_completed {
            self.state.completed_letters.clear();
            pick(&ALPHABET, &mut self.rng)
        } else {
            pick(&remaining, &mut self.rng)
        };

        self.state.progress_count = self.state.completed_letters.len();
        self.state.target_letter = next_target;
        self.state.cooldown_active = true;
        self.feedback = if cycle_completed {
            Feedback::AlphabetComplete {
                letter,
                next_target,
            }
        } else {
            Feedback::Correct {
                letter,
                next_target,
            }
        };

        PracticeOutcome::Scored {
            letter,
            next_target,
            progress: self.state.progress_count,
            cycle_completed,
        }
    }
}

fn pick<R: Rng>(letters: &[char], rng: &mut R) -> char {
    letters.choose(rng).copied().unwrap_or('A')
}
