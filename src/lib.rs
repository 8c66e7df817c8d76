pub mod app;
pub mod camera;
pub mod config;
pub mod detection;
pub mod display;
pub mod error;
pub mod events;
pub mod frame;
pub mod inference;
pub mod keyboard_input;
pub mod pipeline;
pub mod practice;
pub mod sampler;
pub mod view;

#[cfg(feature = "stub-server")]
pub mod stub;

pub use app::{ComponentState, ShutdownReason, SignbuddyOrchestrator};
pub use camera::{CameraDevice, CaptureState, CaptureStatus, MediaCapture, SyntheticCamera};
pub use config::SignbuddyConfig;
pub use detection::{DetectionGate, DetectionSignal, DetectionThresholds, SequenceGuard};
pub use display::StatusDisplay;
pub use error::{CaptureError, InferenceError, Result, SignbuddyError};
pub use events::{EventBus, EventFilter, EventReceiver, SignbuddyEvent};
pub use frame::{EncodedFrame, FrameData, FrameFormat};
pub use inference::{
    DetectionResponse, DetectionService, HttpDetectionService, InferenceClient,
    InferenceCompletion, InferenceOutcome,
};
pub use keyboard_input::KeyboardInputHandler;
pub use pipeline::{DetectionLoop, DetectionLoopHandle, LoopCommand};
pub use practice::{Feedback, PracticeOutcome, PracticeState, PracticeStateMachine};
pub use sampler::FrameSampler;
pub use view::PracticeView;

#[cfg(feature = "stub-server")]
pub use stub::StubServer;
