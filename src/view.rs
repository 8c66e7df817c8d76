use crate::camera::{CaptureState, CaptureStatus};
use crate::detection::DetectionSignal;
use crate::practice::{Feedback, PracticeState, ALPHABET};
use serde::Serialize;

/// Everything the user interface shows, derived from loop state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeView {
    pub capture_state: CaptureState,
    /// Camera problem to show next to the retry control
    pub camera_message: Option<String>,
    pub retry_available: bool,
    pub detected_letter: Option<char>,
    /// `"93.0%"`, present only with a detected letter
    pub confidence_text: Option<String>,
    pub highlight: bool,
    pub target_letter: char,
    pub progress_count: usize,
    /// `"3 / 26"`
    pub progress_text: String,
    pub cooldown_active: bool,
    pub feedback: Option<String>,
    pub positive_feedback: bool,
    /// Last detection service failure, cleared by the next good answer
    pub error: Option<String>,
}

impl PracticeView {
    pub fn project(
        capture: &CaptureStatus,
        signal: &DetectionSignal,
        practice: &PracticeState,
        feedback: Feedback,
        error: Option<&str>,
    ) -> Self {
        let camera_message = match capture.state {
            CaptureState::Error => capture
                .last_error
                .as_ref()
                .map(|e| e.user_message().to_string()),
            _ => None,
        };

        Self {
            capture_state: capture.state,
            camera_message,
            retry_available: capture.retry_available(),
            detected_letter: signal.letter,
            confidence_text: signal
                .letter
                .map(|_| format!("{:.1}%", signal.confidence_percent)),
            highlight: signal.letter.is_some() && signal.highlight,
            target_letter: practice.target_letter,
            progress_count: practice.progress_count,
            progress_text: format!("{} / {}", practice.progress_count, ALPHABET.len()),
            cooldown_active: practice.cooldown_active,
            feedback: feedback.text(),
            positive_feedback: feedback.is_positive(),
            error: error.map(str::to_string),
        }
    }
}
