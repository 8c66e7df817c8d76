use super::device::{CameraDevice, VideoSource};
use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, trace};

/// How the synthetic device answers an open request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticBehavior {
    /// Open succeeds and produces a moving test pattern
    Stream,
    /// Open fails as if the user refused camera access
    DenyPermission,
    /// Open fails as if another process holds the device
    Busy,
}

/// Test-pattern camera used on hosts without V4L2 and throughout the tests
pub struct SyntheticCamera {
    behavior: Mutex<SyntheticBehavior>,
    open_delay: Duration,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::with_behavior(SyntheticBehavior::Stream)
    }

    pub fn with_behavior(behavior: SyntheticBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            open_delay: Duration::ZERO,
            opens: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate a slow permission prompt
    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Change the answer for subsequent opens (e.g. the user granted access)
    pub fn set_behavior(&self, behavior: SyntheticBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Number of open attempts so far
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of streams whose tracks were released
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraDevice for SyntheticCamera {
    fn describe(&self, config: &CameraConfig) -> String {
        format!("synthetic:{}", config.index)
    }

    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn VideoSource>, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        let device = self.describe(config);
        let behavior = *self.behavior.lock();
        match behavior {
            SyntheticBehavior::DenyPermission => Err(CaptureError::PermissionDenied {
                device,
                details: "access refused".to_string(),
            }),
            SyntheticBehavior::Busy => Err(CaptureError::DeviceUnavailable {
                device,
                details: "device is in use by another application".to_string(),
            }),
            SyntheticBehavior::Stream => {
                info!(
                    "Synthetic camera {} streaming at {}x{}",
                    device, config.resolution.0, config.resolution.1
                );
                Ok(Box::new(SyntheticSource {
                    width: config.resolution.0,
                    height: config.resolution.1,
                    frame_counter: AtomicU64::new(0),
                    live: true,
                    releases: Arc::clone(&self.releases),
                }))
            }
        }
    }
}

struct SyntheticSource {
    width: u32,
    height: u32,
    frame_counter: AtomicU64,
    live: bool,
    releases: Arc<AtomicUsize>,
}

impl VideoSource for SyntheticSource {
    fn latest_frame(&self) -> Option<FrameData> {
        if !self.live {
            return None;
        }

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let shift = (frame_id % 256) as u8;
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push((x as u8).wrapping_add(shift));
                data.push((y as u8).wrapping_add(shift));
                data.push(shift);
            }
        }

        trace!("Generated synthetic frame {}", frame_id);

        Some(FrameData::new(
            frame_id,
            SystemTime::now(),
            data,
            self.width,
            self.height,
            FrameFormat::Rgb24,
        ))
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.releases.fetch_add(1, Ordering::SeqCst);
            debug!("Synthetic camera tracks released");
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop();
    }
}
