use super::device::CameraDevice;
use super::media::MediaCapture;
use super::synthetic::SyntheticCamera;
use crate::config::{CameraConfig, CameraSource};
use crate::error::{CaptureError, SignbuddyError, Result};
use std::sync::Arc;

/// Builder for [`MediaCapture`]
pub struct MediaCaptureBuilder {
    config: Option<CameraConfig>,
    device: Option<Arc<dyn CameraDevice>>,
}

impl MediaCaptureBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            device: None,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a specific device instead of the one named by `camera.source`
    pub fn device(mut self, device: Arc<dyn CameraDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn build(self) -> Result<MediaCapture> {
        let config = self
            .config
            .ok_or_else(|| SignbuddyError::system("Camera configuration must be specified"))?;

        let device = match self.device {
            Some(device) => device,
            None => device_for_source(config.source)?,
        };

        Ok(MediaCapture::new(config, device))
    }
}

impl Default for MediaCaptureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Instantiate the backend named in the configuration
pub fn device_for_source(
    source: CameraSource,
) -> std::result::Result<Arc<dyn CameraDevice>, CaptureError> {
    match source {
        CameraSource::Synthetic => Ok(Arc::new(SyntheticCamera::new())),
        #[cfg(all(feature = "camera", target_os = "linux"))]
        CameraSource::Gstreamer => Ok(Arc::new(super::v4l2::GstreamerCamera::new()?)),
        #[cfg(not(all(feature = "camera", target_os = "linux")))]
        CameraSource::Gstreamer => Err(CaptureError::Configuration {
            details: "GStreamer capture needs Linux and the `camera` feature".to_string(),
        }),
    }
}
