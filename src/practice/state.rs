use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Letters of the fingerspelling alphabet, in order
pub const ALPHABET: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

pub fn is_practice_letter(letter: char) -> bool {
    letter.is_ascii_uppercase()
}

/// Progress through one pass of the alphabet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeState {
    pub target_letter: char,
    pub completed_letters: BTreeSet<char>,
    /// Always equal to `completed_letters.len()`
    pub progress_count: usize,
    pub cooldown_active: bool,
    pub last_scored_letter: Option<char>,
}

impl PracticeState {
    pub fn new(target_letter: char) -> Self {
        Self {
            target_letter,
            completed_letters: BTreeSet::new(),
            progress_count: 0,
            cooldown_active: false,
            last_scored_letter: None,
        }
    }

    /// Letters still to be scored in this pass
    pub fn remaining(&self) -> Vec<char> {
        ALPHABET
            .iter()
            .copied()
            .filter(|letter| !self.completed_letters.contains(letter))
            .collect()
    }
}

/// Message shown under the target letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Feedback {
    #[default]
    None,
    Correct { letter: char, next_target: char },
    AlphabetComplete { letter: char, next_target: char },
    TryAgain { detected: char, target: char },
}

impl Feedback {
    pub fn text(&self) -> Option<String> {
        match self {
            Feedback::None => None,
            Feedback::Correct { letter, next_target } => Some(format!(
                "Correct! You signed {}. Next letter: {}",
                letter, next_target
            )),
            Feedback::AlphabetComplete { next_target, .. } => Some(format!(
                "You finished the whole alphabet! Starting over with {}",
                next_target
            )),
            Feedback::TryAgain { detected, target } => Some(format!(
                "That looks like {}. Try signing {}.",
                detected, target
            )),
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            Feedback::Correct { .. } | Feedback::AlphabetComplete { .. }
        )
    }
}
