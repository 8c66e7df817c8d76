use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::frame::FrameData;
use async_trait::async_trait;
use std::io;

/// Something that can be asked for a camera stream
///
/// Opening is the permission/availability checkpoint: every failure must be
/// reported as a [`CaptureError`] so callers can tell denial from a busy device.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Human-readable device label used in logs and errors
    fn describe(&self, config: &CameraConfig) -> String;

    /// Acquire the device and start streaming
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn VideoSource>, CaptureError>;
}

/// A live stream handed out by [`CameraDevice::open`]
pub trait VideoSource: Send + Sync {
    /// Most recent frame, if one has arrived
    fn latest_frame(&self) -> Option<FrameData>;

    /// Release every underlying track. Must be idempotent.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}

/// Map an OS error from opening a device node onto the capture taxonomy
pub fn classify_open_error(device: &str, err: &io::Error) -> CaptureError {
    #[cfg(unix)]
    {
        match err.raw_os_error() {
            Some(code) if code == libc::EACCES || code == libc::EPERM => {
                return CaptureError::PermissionDenied {
                    device: device.to_string(),
                    details: err.to_string(),
                };
            }
            Some(code) if code == libc::EBUSY => {
                return CaptureError::DeviceUnavailable {
                    device: device.to_string(),
                    details: "device is in use by another process".to_string(),
                };
            }
            Some(code) if code == libc::ENOENT || code == libc::ENODEV || code == libc::ENXIO => {
                return CaptureError::DeviceUnavailable {
                    device: device.to_string(),
                    details: "device is not connected".to_string(),
                };
            }
            _ => {}
        }
    }

    match err.kind() {
        io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied {
            device: device.to_string(),
            details: err.to_string(),
        },
        _ => CaptureError::DeviceUnavailable {
            device: device.to_string(),
            details: err.to_string(),
        },
    }
}
