use thiserror::Error;

/// Message shown when the inference service cannot be reached or answers garbage
pub const DETECTION_SERVICE_MESSAGE: &str =
    "Failed to communicate with the sign detection service.";

#[derive(Error, Debug)]
pub enum SignbuddyError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Camera error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Frame encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl SignbuddyError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Camera acquisition failures
///
/// Cloneable so the last error can travel inside the observable capture status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Permission denied for camera {device}: {details}")]
    PermissionDenied { device: String, details: String },

    #[error("Camera {device} unavailable: {details}")]
    DeviceUnavailable { device: String, details: String },

    #[error("Camera stream failure: {details}")]
    Stream { details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },
}

impl CaptureError {
    /// Whether the user has to grant access before a retry can succeed
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, CaptureError::PermissionDenied { .. })
    }

    /// Text presented next to the retry affordance
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied { .. } => {
                "Camera access denied. Please allow camera access in your system settings."
            }
            _ => {
                "Unable to access camera. Please make sure your camera is connected and not in use by another application."
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Transport failure: {details}")]
    Transport { details: String },

    #[error("Detection service answered with HTTP status {status}")]
    Status { status: u16 },

    #[error("Malformed detection response: {details}")]
    Parse { details: String },

    #[error("Inference task failed: {details}")]
    Task { details: String },
}

impl InferenceError {
    pub fn user_message(&self) -> &'static str {
        DETECTION_SERVICE_MESSAGE
    }
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Frame {frame_id} has {actual} bytes, expected {expected}")]
    InvalidSize {
        frame_id: u64,
        expected: usize,
        actual: usize,
    },

    #[error("JPEG encoding failed: {details}")]
    Jpeg { details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, SignbuddyError>;
