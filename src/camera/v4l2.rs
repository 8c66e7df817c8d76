use super::device::{classify_open_error, CameraDevice, VideoSource};
use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Notify;
use tracing::{debug, error, info, trace, warn};

/// V4L2 camera read through a GStreamer MJPEG pipeline
pub struct GstreamerCamera;

impl GstreamerCamera {
    pub fn new() -> Result<Self, CaptureError> {
        gstreamer::init().map_err(|e| CaptureError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        Ok(Self)
    }

    fn device_path(config: &CameraConfig) -> String {
        format!("/dev/video{}", config.index)
    }

    /// Open the node ourselves first so access errors keep their errno
    fn probe_device(device: &str) -> Result<(), CaptureError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .map(|_| ())
            .map_err(|e| classify_open_error(device, &e))
    }

    fn build_pipeline_string(config: &CameraConfig) -> String {
        let (width, height) = config.resolution;

        format!(
            "v4l2src device={} io-mode=mmap do-timestamp=true ! \
             image/jpeg,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=4 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=2 drop=true qos=false enable-last-sample=false emit-signals=false",
            Self::device_path(config),
            width,
            height,
            config.fps
        )
    }

    fn frame_from_sample(
        sample: &gstreamer::Sample,
        frame_counter: &AtomicU64,
    ) -> Result<FrameData, CaptureError> {
        let buffer = sample.buffer().ok_or_else(|| CaptureError::Stream {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CaptureError::Stream {
            details: "No caps in sample".to_string(),
        })?;

        let structure = caps.structure(0).ok_or_else(|| CaptureError::Stream {
            details: "Empty caps in sample".to_string(),
        })?;

        let width = structure.get::<i32>("width").map_err(|e| CaptureError::Stream {
            details: format!("Missing width in caps: {}", e),
        })?;
        let height = structure.get::<i32>("height").map_err(|e| CaptureError::Stream {
            details: format!("Missing height in caps: {}", e),
        })?;

        let map = buffer.map_readable().map_err(|e| CaptureError::Stream {
            details: format!("Failed to map buffer: {}", e),
        })?;

        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);

        trace!(
            "Captured MJPEG frame {} ({}x{}, {} bytes)",
            frame_id,
            width,
            height,
            map.len()
        );

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            width as u32,
            height as u32,
            FrameFormat::Mjpeg,
        ))
    }
}

#[async_trait]
impl CameraDevice for GstreamerCamera {
    fn describe(&self, config: &CameraConfig) -> String {
        Self::device_path(config)
    }

    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn VideoSource>, CaptureError> {
        let device = Self::device_path(config);
        Self::probe_device(&device)?;

        let pipeline_desc = Self::build_pipeline_string(config);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CaptureError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CaptureError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let pipeline = PipelineGuard::new(pipeline);

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CaptureError::Configuration {
                details: "Pipeline has no appsink".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CaptureError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        let latest: Arc<Mutex<Option<FrameData>>> = Arc::new(Mutex::new(None));
        let first_frame = Arc::new(Notify::new());
        let frame_counter = Arc::new(AtomicU64::new(0));

        {
            let latest = Arc::clone(&latest);
            let first_frame = Arc::clone(&first_frame);
            appsink.set_callbacks(
                gstreamer_app::AppSinkCallbacks::builder()
                    .new_sample(move |appsink| {
                        let sample = appsink
                            .pull_sample()
                            .map_err(|_| gstreamer::FlowError::Eos)?;
                        match Self::frame_from_sample(&sample, &frame_counter) {
                            Ok(frame) => {
                                *latest.lock() = Some(frame);
                                first_frame.notify_one();
                            }
                            Err(e) => warn!("Dropping camera sample: {}", e),
                        }
                        Ok(gstreamer::FlowSuccess::Ok)
                    })
                    .build(),
            );
        }

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            return Err(CaptureError::DeviceUnavailable {
                device,
                details: format!("Failed to start pipeline, device may be in use: {}", e),
            });
        }

        let startup_timeout = Duration::from_millis(config.startup_timeout_ms);
        if tokio::time::timeout(startup_timeout, first_frame.notified())
            .await
            .is_err()
        {
            return Err(CaptureError::DeviceUnavailable {
                device,
                details: format!("No frames received within {:?}", startup_timeout),
            });
        }

        info!("GStreamer pipeline streaming from {}", device);

        Ok(Box::new(GstreamerSource {
            pipeline: pipeline.into_inner(),
            latest,
            live: true,
        }))
    }
}

/// Shuts a pipeline down unless it was handed over to a [`GstreamerSource`]
///
/// Covers early returns and the open future being dropped while it waits
/// for the first frame.
struct PipelineGuard {
    pipeline: Pipeline,
    armed: bool,
}

impl PipelineGuard {
    fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            armed: true,
        }
    }

    fn into_inner(mut self) -> Pipeline {
        self.armed = false;
        self.pipeline.clone()
    }
}

impl std::ops::Deref for PipelineGuard {
    type Target = Pipeline;

    fn deref(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.pipeline.set_state(gstreamer::State::Null) {
            Ok(_) => debug!("Abandoned GStreamer pipeline shut down"),
            Err(e) => error!("Failed to shut down abandoned pipeline: {}", e),
        }
    }
}

struct GstreamerSource {
    pipeline: Pipeline,
    latest: Arc<Mutex<Option<FrameData>>>,
    live: bool,
}

impl VideoSource for GstreamerSource {
    fn latest_frame(&self) -> Option<FrameData> {
        if !self.live {
            return None;
        }
        self.latest.lock().clone()
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            error!("Failed to stop GStreamer pipeline: {}", e);
        } else {
            debug!("GStreamer pipeline stopped");
        }
        self.latest.lock().take();
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for GstreamerSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_guard_shuts_down_abandoned_pipeline() {
        gstreamer::init().unwrap();

        let pipeline = Pipeline::new();
        pipeline.set_state(gstreamer::State::Playing).unwrap();
        {
            let _guard = PipelineGuard::new(pipeline.clone());
        }

        assert_eq!(pipeline.current_state(), gstreamer::State::Null);
    }

    #[test]
    fn test_pipeline_guard_hands_over_running_pipeline() {
        gstreamer::init().unwrap();

        let pipeline = Pipeline::new();
        pipeline.set_state(gstreamer::State::Playing).unwrap();
        let handed_over = PipelineGuard::new(pipeline.clone()).into_inner();

        assert_ne!(handed_over.current_state(), gstreamer::State::Null);
        handed_over.set_state(gstreamer::State::Null).unwrap();
    }
}
