mod machine;
mod state;
#[cfg(test)]
mod tests;

pub use machine::{PracticeOutcome, PracticeStateMachine};
pub use state::{is_practice_letter, Feedback, PracticeState, ALPHABET};
