mod builder;
mod device;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod v4l2;
mod media;
mod state;
mod synthetic;

pub use builder::{device_for_source, MediaCaptureBuilder};
pub use device::{classify_open_error, CameraDevice, VideoSource};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use v4l2::GstreamerCamera;
pub use media::{CaptureSession, MediaCapture};
pub use state::{CaptureState, CaptureStatus};
pub use synthetic::{SyntheticBehavior, SyntheticCamera};
