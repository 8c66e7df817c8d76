use super::device::{CameraDevice, VideoSource};
use super::state::{CaptureState, CaptureStatus};
use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::frame::FrameData;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One successful camera acquisition
pub struct CaptureSession {
    pub id: Uuid,
    pub device: String,
    pub started_at: DateTime<Utc>,
    source: Box<dyn VideoSource>,
}

/// Owns the camera handle and its request → stream → teardown lifecycle
///
/// State lives in a `watch` channel so the detection loop can react to
/// transitions. Session and status are always updated under the session
/// lock, which serializes `start` completion against `stop`. Every `start`
/// and `stop` bumps the request generation; a device request only applies
/// its result while its generation is still current.
pub struct MediaCapture {
    config: CameraConfig,
    device: Arc<dyn CameraDevice>,
    session: Mutex<Option<CaptureSession>>,
    status: watch::Sender<CaptureStatus>,
    generation: AtomicU64,
}

impl MediaCapture {
    pub fn new(config: CameraConfig, device: Arc<dyn CameraDevice>) -> Self {
        let (status, _) = watch::channel(CaptureStatus::new());

        Self {
            config,
            device,
            session: Mutex::new(None),
            status,
            generation: AtomicU64::new(0),
        }
    }

    /// Request the camera and start streaming
    ///
    /// No-op while a request is outstanding or a stream is live. From
    /// `Error` or `Stopped` this is the user-initiated retry.
    pub async fn start(&self) -> Result<CaptureState, CaptureError> {
        let mut request = 0;
        let begun = self.status.send_if_modified(|status| {
            if status.state.is_active() {
                return false;
            }
            request = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            status.transition(CaptureState::Requesting);
            status.last_error = None;
            status.session_id = None;
            true
        });

        if !begun {
            debug!("Camera start ignored, state is {:?}", self.state());
            return Ok(self.state());
        }

        let label = self.device.describe(&self.config);
        info!("Requesting camera {} (request {})", label, request);

        match self.device.open(&self.config).await {
            Ok(mut source) => {
                let mut session = self.session.lock();
                let id = Uuid::new_v4();

                let streaming = self.status.send_if_modified(|status| {
                    if !self.is_current(request) || status.state != CaptureState::Requesting {
                        return false;
                    }
                    status.transition(CaptureState::Streaming);
                    status.session_id = Some(id);
                    true
                });

                if !streaming {
                    drop(session);
                    source.stop();
                    info!(
                        "Camera {} opened for superseded request {}, released it",
                        label, request
                    );
                    return Ok(self.state());
                }

                *session = Some(CaptureSession {
                    id,
                    device: label.clone(),
                    started_at: Utc::now(),
                    source,
                });

                info!("Camera {} streaming (session {})", label, id);
                Ok(CaptureState::Streaming)
            }
            Err(e) => {
                warn!("Camera {} request failed: {}", label, e);

                let _guard = self.session.lock();
                let applied = self.status.send_if_modified(|status| {
                    if !self.is_current(request) || status.state != CaptureState::Requesting {
                        return false;
                    }
                    status.transition(CaptureState::Error);
                    status.last_error = Some(e.clone());
                    true
                });
                if !applied {
                    debug!("Ignoring failure of superseded camera request {}", request);
                }

                Err(e)
            }
        }
    }

    /// Release all device tracks. Safe to call any number of times.
    pub fn stop(&self) {
        let mut session = self.session.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(mut active) = session.take() {
            active.source.stop();
            info!(
                "Camera {} stopped (session {}, streamed since {})",
                active.device, active.id, active.started_at
            );
        }

        self.status.send_if_modified(|status| {
            if status.state == CaptureState::Stopped {
                return false;
            }
            status.transition(CaptureState::Stopped);
            status.session_id = None;
            true
        });
    }

    fn is_current(&self, request: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == request
    }

    /// Most recent frame of the live stream
    pub fn latest_frame(&self) -> Option<FrameData> {
        let session = self.session.lock();
        let active = session.as_ref()?;

        if !active.source.is_live() {
            return None;
        }
        active.source.latest_frame()
    }

    pub fn state(&self) -> CaptureState {
        self.status.borrow().state
    }

    pub fn status(&self) -> CaptureStatus {
        self.status.borrow().clone()
    }

    /// Observe lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<CaptureStatus> {
        self.status.subscribe()
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

impl Drop for MediaCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
