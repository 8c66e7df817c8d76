use crate::camera::MediaCapture;
use crate::config::SamplerConfig;
use crate::events::{EventBus, SignbuddyEvent};
use crate::frame::FrameProcessor;
use crate::inference::{InferenceClient, InferenceCompletion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

struct SamplerTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically turns the live camera frame into a detection request
///
/// Each tick takes the latest frame, stamps it with the next sequence
/// number, encodes it and fires the inference call as its own task, so a
/// slow round trip never delays the next tick. Sequence numbers come from a
/// counter that outlives individual start/stop cycles.
pub struct FrameSampler {
    config: SamplerConfig,
    capture: Arc<MediaCapture>,
    client: Arc<InferenceClient>,
    completions: mpsc::UnboundedSender<InferenceCompletion>,
    event_bus: Arc<EventBus>,
    sequence: Arc<AtomicU64>,
    task: Option<SamplerTask>,
}

impl FrameSampler {
    pub fn new(
        config: SamplerConfig,
        capture: Arc<MediaCapture>,
        client: Arc<InferenceClient>,
        completions: mpsc::UnboundedSender<InferenceCompletion>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            capture,
            client,
            completions,
            event_bus,
            sequence: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    /// Start ticking; a no-op if already running
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Frame sampler already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let worker = SamplerWorker {
            config: self.config.clone(),
            capture: Arc::clone(&self.capture),
            client: Arc::clone(&self.client),
            completions: self.completions.clone(),
            event_bus: Arc::clone(&self.event_bus),
            sequence: Arc::clone(&self.sequence),
        };

        let handle = tokio::spawn(worker.run(cancel.clone()));
        self.task = Some(SamplerTask { cancel, handle });

        info!(
            "Frame sampler started ({} ms interval)",
            self.config.sample_interval_ms
        );
        true
    }

    /// Cancel the timer and every in-flight request
    ///
    /// Returns the last sequence number issued; anything at or below it that
    /// still arrives belongs to the stopped run.
    pub fn stop(&mut self) -> u64 {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            task.handle.abort();
            info!("Frame sampler stopped at #{}", self.last_issued());
        }
        self.last_issued()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn last_issued(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct SamplerWorker {
    config: SamplerConfig,
    capture: Arc<MediaCapture>,
    client: Arc<InferenceClient>,
    completions: mpsc::UnboundedSender<InferenceCompletion>,
    event_bus: Arc<EventBus>,
    sequence: Arc<AtomicU64>,
}

impl SamplerWorker {
    async fn run(self, cancel: CancellationToken) {
        let period = self.config.sample_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.sample(&mut in_flight, &cancel),
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        if !e.is_cancelled() {
                            error!("Inference task failed: {}", e);
                        }
                    }
                }
            }
        }

        if !in_flight.is_empty() {
            debug!("Aborting {} in-flight inference requests", in_flight.len());
        }
        in_flight.abort_all();
    }

    fn sample(&self, in_flight: &mut JoinSet<()>, cancel: &CancellationToken) {
        let frame = match self.capture.latest_frame() {
            Some(frame) => frame,
            None => {
                trace!("No frame available, skipping tick");
                return;
            }
        };

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let encoded =
            match FrameProcessor::encode_for_detection(&frame, sequence, self.config.jpeg_quality) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!("Failed to encode frame {} for detection: {}", frame.id, e);
                    self.event_bus.publish(SignbuddyEvent::SystemError {
                        component: "frame_sampler".to_string(),
                        error: e.to_string(),
                    });
                    return;
                }
            };

        self.event_bus.publish(SignbuddyEvent::FrameSampled {
            sequence,
            frame_id: frame.id,
            timestamp: frame.timestamp,
        });

        let client = Arc::clone(&self.client);
        let completions = self.completions.clone();
        let cancel = cancel.clone();
        in_flight.spawn(async move {
            let outcome = client.detect(&encoded).await;
            // A sequence issued after stop() read the counter must never reach the loop
            if cancel.is_cancelled() {
                return;
            }
            if completions
                .send(InferenceCompletion { sequence, outcome })
                .is_err()
            {
                trace!("Completion #{} dropped, detection loop is gone", sequence);
            }
        });
    }
}
