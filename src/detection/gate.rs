use crate::config::DetectionConfig;
use crate::inference::{DetectionResponse, InferenceOutcome};
use serde::{Deserialize, Serialize};

/// Confidence cut-offs, both as fractions in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionThresholds {
    /// Minimum confidence for a letter to be reported at all
    pub report: f64,
    /// Minimum confidence for the reported letter to be highlighted
    pub highlight: f64,
}

impl DetectionThresholds {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            report: config.report_threshold,
            highlight: config.highlight_threshold,
        }
    }
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            report: 0.75,
            highlight: 0.85,
        }
    }
}

/// The stable detected-letter signal consumed by the practice game
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionSignal {
    pub letter: Option<char>,
    pub confidence_percent: f64,
    pub highlight: bool,
}

impl DetectionSignal {
    /// Nothing recognized above the report threshold
    pub fn none() -> Self {
        Self::default()
    }
}

/// Stateless confidence filter between the detection service and the game
///
/// Below the report threshold the signal resets to "no letter" rather than
/// holding the previous value.
#[derive(Debug, Clone, Copy)]
pub struct DetectionGate {
    thresholds: DetectionThresholds,
}

impl DetectionGate {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> DetectionThresholds {
        self.thresholds
    }

    pub fn apply(&self, response: &DetectionResponse) -> DetectionSignal {
        let letter = match response.letter {
            Some(letter) if response.confidence >= self.thresholds.report => letter,
            _ => return DetectionSignal::none(),
        };

        DetectionSignal {
            letter: Some(letter),
            confidence_percent: response.confidence * 100.0,
            highlight: response.confidence >= self.thresholds.highlight,
        }
    }

    /// Failed and empty outcomes read as "no letter"
    pub fn evaluate(&self, outcome: &InferenceOutcome) -> DetectionSignal {
        outcome
            .response()
            .map(|response| self.apply(response))
            .unwrap_or_else(DetectionSignal::none)
    }
}
