mod client;
#[cfg(test)]
pub(crate) mod mock;
mod protocol;
#[cfg(test)]
mod tests;

pub use client::{DetectionService, HttpDetectionService, InferenceClient, InferenceStats};
pub use protocol::{
    DetectRequest, DetectResponseBody, DetectionResponse, InferenceCompletion, InferenceOutcome,
};
