use crate::error::InferenceError;
use serde::{Deserialize, Serialize};

/// Body of `POST {base_url}{detect_path}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    /// `data:image/jpeg;base64,...`
    pub image: String,
}

/// Wire form of the detection service answer
///
/// Every field is optional on the wire; a body without `success: true` is a
/// "no detection" answer, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectResponseBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectResponseBody {
    pub fn detected(letter: char, confidence: f64) -> Self {
        Self {
            success: true,
            letter: Some(letter.to_string()),
            confidence: Some(confidence),
            error: None,
        }
    }

    pub fn rejected<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            letter: None,
            confidence: None,
            error: Some(error.into()),
        }
    }

    /// Validate the body into a typed outcome
    pub fn interpret(self) -> InferenceOutcome {
        if !self.success {
            return InferenceOutcome::NoDetection;
        }

        let letter = match self.letter.as_deref().and_then(parse_letter) {
            Some(letter) => letter,
            None => return InferenceOutcome::NoDetection,
        };

        match self.confidence {
            Some(confidence) if (0.0..=1.0).contains(&confidence) => {
                InferenceOutcome::Detected(DetectionResponse {
                    letter: Some(letter),
                    confidence,
                })
            }
            _ => InferenceOutcome::NoDetection,
        }
    }
}

/// Accept exactly one ASCII letter; lowercase is folded to uppercase
fn parse_letter(raw: &str) -> Option<char> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

/// A validated classification: letter in `A..=Z`, confidence in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResponse {
    pub letter: Option<char>,
    pub confidence: f64,
}

/// Result of one detection round trip
///
/// Failures are values, not errors: the caller treats them as "nothing
/// detected" for the tick and surfaces the message.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    Detected(DetectionResponse),
    NoDetection,
    Failed(InferenceError),
}

impl InferenceOutcome {
    pub fn response(&self) -> Option<&DetectionResponse> {
        match self {
            InferenceOutcome::Detected(response) => Some(response),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&InferenceError> {
        match self {
            InferenceOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// An outcome tagged with the sequence number of the frame it answers
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceCompletion {
    pub sequence: u64,
    pub outcome: InferenceOutcome,
}
