use crate::camera::{CaptureState, CaptureStatus, MediaCapture};
use crate::config::SignbuddyConfig;
use crate::detection::{DetectionGate, DetectionSignal, DetectionThresholds, SequenceGuard};
use crate::error::{Result, SignbuddyError};
use crate::events::{EventBus, SignbuddyEvent};
use crate::inference::{InferenceClient, InferenceCompletion, InferenceOutcome};
use crate::practice::{PracticeOutcome, PracticeStateMachine};
use crate::sampler::FrameSampler;
use crate::view::PracticeView;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Requests from the user interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    /// Ask for the camera again after an error or stop
    RetryCamera,
    /// Abandon the current target for another random letter
    SkipTarget,
    SetTarget(char),
}

/// Cloneable access to a running [`DetectionLoop`]
#[derive(Clone)]
pub struct DetectionLoopHandle {
    commands: mpsc::Sender<LoopCommand>,
    view: watch::Receiver<PracticeView>,
}

impl DetectionLoopHandle {
    pub async fn send(&self, command: LoopCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SignbuddyError::component("detection_loop", "command channel closed"))
    }

    pub fn view(&self) -> watch::Receiver<PracticeView> {
        self.view.clone()
    }

    pub fn current_view(&self) -> PracticeView {
        self.view.borrow().clone()
    }
}

/// The single task that owns detection and practice state
///
/// Inference completions, camera transitions, user commands and the
/// cooldown deadline are all handled here, one at a time, so none of the
/// state below needs a lock.
pub struct DetectionLoop {
    capture: Arc<MediaCapture>,
    sampler: FrameSampler,
    completions: mpsc::UnboundedReceiver<InferenceCompletion>,
    commands: mpsc::Receiver<LoopCommand>,
    event_bus: Arc<EventBus>,
    gate: DetectionGate,
    guard: SequenceGuard,
    practice: PracticeStateMachine<StdRng>,
    capture_status: CaptureStatus,
    signal: DetectionSignal,
    last_error: Option<String>,
    cooldown_deadline: Option<Instant>,
    view: watch::Sender<PracticeView>,
}

impl DetectionLoop {
    pub fn new(
        config: &SignbuddyConfig,
        capture: Arc<MediaCapture>,
        client: Arc<InferenceClient>,
        event_bus: Arc<EventBus>,
    ) -> (Self, DetectionLoopHandle) {
        Self::with_rng(config, capture, client, event_bus, StdRng::from_entropy())
    }

    /// Like [`DetectionLoop::new`] with a caller-chosen target sequence
    pub fn with_rng(
        config: &SignbuddyConfig,
        capture: Arc<MediaCapture>,
        client: Arc<InferenceClient>,
        event_bus: Arc<EventBus>,
        rng: StdRng,
    ) -> (Self, DetectionLoopHandle) {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let sampler = FrameSampler::new(
            config.sampler.clone(),
            Arc::clone(&capture),
            client,
            completions_tx,
            Arc::clone(&event_bus),
        );

        let practice = PracticeStateMachine::new(config.practice.cooldown(), rng);
        let capture_status = capture.status();
        let signal = DetectionSignal::none();

        let initial = PracticeView::project(
            &capture_status,
            &signal,
            practice.state(),
            practice.feedback(),
            None,
        );
        let (view_tx, view_rx) = watch::channel(initial);

        let detection_loop = Self {
            capture,
            sampler,
            completions,
            commands,
            event_bus,
            gate: DetectionGate::new(DetectionThresholds::from_config(&config.detection)),
            guard: SequenceGuard::new(),
            practice,
            capture_status,
            signal,
            last_error: None,
            cooldown_deadline: None,
            view: view_tx,
        };

        let handle = DetectionLoopHandle {
            commands: commands_tx,
            view: view_rx,
        };

        (detection_loop, handle)
    }

    /// Run until cancelled
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Detection loop started, first target {}",
            self.practice.target()
        );

        let mut capture_rx = self.capture.subscribe();
        let initial = capture_rx.borrow_and_update().clone();
        self.on_capture_status(initial);
        self.publish_view();

        let mut commands_open = true;

        loop {
            let deadline = self.cooldown_deadline;

            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(completion) = self.completions.recv() => {
                    self.apply_completion(completion);
                }
                changed = capture_rx.changed() => {
                    if changed.is_err() {
                        warn!("Capture status channel closed");
                        break;
                    }
                    let status = capture_rx.borrow_and_update().clone();
                    self.on_capture_status(status);
                }
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All command senders dropped");
                        commands_open = false;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire_cooldown();
                }
            }

            self.publish_view();
        }

        self.teardown();
        self.publish_view();
        info!("Detection loop stopped");
    }

    /// Apply one inference completion if it is still current
    pub fn apply_completion(&mut self, completion: InferenceCompletion) -> bool {
        let InferenceCompletion { sequence, outcome } = completion;

        if !self.guard.accept(sequence) {
            debug!(
                "Discarding stale response #{} (highest applied #{}, floor #{})",
                sequence,
                self.guard.highest_applied(),
                self.guard.floor()
            );
            self.event_bus
                .publish(SignbuddyEvent::StaleResponseDiscarded {
                    sequence,
                    highest_applied: self.guard.highest_applied(),
                });
            return false;
        }

        match &outcome {
            InferenceOutcome::Failed(e) => {
                self.last_error = Some(e.user_message().to_string());
                self.event_bus.publish(SignbuddyEvent::InferenceFailed {
                    sequence,
                    error: e.to_string(),
                });
            }
            _ => self.last_error = None,
        }

        self.signal = self.gate.evaluate(&outcome);
        self.event_bus.publish(SignbuddyEvent::DetectionUpdated {
            sequence,
            letter: self.signal.letter,
            confidence_percent: self.signal.confidence_percent,
            highlight: self.signal.highlight,
        });

        match self.practice.on_signal(&self.signal) {
            PracticeOutcome::Scored {
                letter,
                next_target,
                progress,
                cycle_completed,
            } => {
                self.cooldown_deadline = Some(Instant::now() + self.practice.cooldown());
                self.event_bus.publish(SignbuddyEvent::LetterScored {
                    letter,
                    progress,
                    next_target,
                    cycle_completed,
                });
            }
            PracticeOutcome::Mismatch { detected, target } => {
                self.event_bus
                    .publish(SignbuddyEvent::LetterMismatch { detected, target });
            }
            PracticeOutcome::Debounced | PracticeOutcome::Ignored => {}
        }

        true
    }

    pub fn handle_command(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::RetryCamera => {
                if self.capture_status.state.is_active() {
                    debug!("Camera retry ignored while {:?}", self.capture_status.state);
                    return;
                }
                info!("Retrying camera access");
                let capture = Arc::clone(&self.capture);
                tokio::spawn(async move {
                    if let Err(e) = capture.start().await {
                        debug!("Camera retry failed: {}", e);
                    }
                });
            }
            LoopCommand::SkipTarget => {
                let target = self.practice.skip_target();
                self.event_bus
                    .publish(SignbuddyEvent::TargetChanged { target });
            }
            LoopCommand::SetTarget(letter) => {
                if self.practice.set_target(letter) {
                    self.event_bus.publish(SignbuddyEvent::TargetChanged {
                        target: self.practice.target(),
                    });
                } else {
                    warn!("Ignoring practice target {:?}", letter);
                }
            }
        }
    }

    pub fn expire_cooldown(&mut self) {
        self.cooldown_deadline = None;
        if self.practice.on_cooldown_expired() {
            self.event_bus.publish(SignbuddyEvent::CooldownExpired {
                target: self.practice.target(),
            });
        }
    }

    fn on_capture_status(&mut self, status: CaptureStatus) {
        let changed = status.state != self.capture_status.state;
        self.capture_status = status;

        if self.capture_status.state == CaptureState::Streaming {
            self.sampler.start();
        } else {
            self.stop_sampling();
        }

        if changed {
            self.event_bus.publish(SignbuddyEvent::CaptureStateChanged {
                state: self.capture_status.state,
                error: self
                    .capture_status
                    .last_error
                    .as_ref()
                    .map(|e| e.user_message().to_string()),
                timestamp: SystemTime::now(),
            });
        }
    }

    fn stop_sampling(&mut self) {
        if self.sampler.is_running() {
            let last_issued = self.sampler.stop();
            self.guard.invalidate_through(last_issued);
            self.signal = DetectionSignal::none();
            debug!("Responses up to #{} invalidated", last_issued);
        }
    }

    fn teardown(&mut self) {
        self.stop_sampling();
        self.cooldown_deadline = None;
    }

    fn publish_view(&self) {
        let view = self.current_view();
        self.view.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    pub fn current_view(&self) -> PracticeView {
        PracticeView::project(
            &self.capture_status,
            &self.signal,
            self.practice.state(),
            self.practice.feedback(),
            self.last_error.as_deref(),
        )
    }

    pub fn practice(&self) -> &PracticeStateMachine<StdRng> {
        &self.practice
    }

    pub fn signal(&self) -> DetectionSignal {
        self.signal
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    pub fn cooldown_deadline(&self) -> Option<Instant> {
        self.cooldown_deadline
    }
}
