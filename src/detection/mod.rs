mod gate;
mod sequencer;

pub use gate::{DetectionGate, DetectionSignal, DetectionThresholds};
pub use sequencer::SequenceGuard;
