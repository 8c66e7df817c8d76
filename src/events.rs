use crate::camera::CaptureState;
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the signbuddy system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignbuddyEvent {
    /// Camera lifecycle moved to a new state
    CaptureStateChanged {
        state: CaptureState,
        error: Option<String>,
        timestamp: SystemTime,
    },
    /// A frame was sampled and dispatched for detection
    FrameSampled {
        sequence: u64,
        frame_id: u64,
        timestamp: SystemTime,
    },
    /// A detection response was applied
    DetectionUpdated {
        sequence: u64,
        letter: Option<char>,
        confidence_percent: f64,
        highlight: bool,
    },
    /// A response arrived out of order or after teardown and was dropped
    StaleResponseDiscarded { sequence: u64, highest_applied: u64 },
    /// The detection service could not be reached or answered garbage
    InferenceFailed { sequence: u64, error: String },
    /// The practice target was matched
    LetterScored {
        letter: char,
        progress: usize,
        next_target: char,
        cycle_completed: bool,
    },
    /// A different letter than the target was shown
    LetterMismatch { detected: char, target: char },
    /// Scoring cooldown elapsed
    CooldownExpired { target: char },
    /// Target changed outside of scoring (skip)
    TargetChanged { target: char },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl SignbuddyEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SignbuddyEvent::CaptureStateChanged { state, error, .. } => match error {
                Some(error) => format!("Camera {:?}: {}", state, error),
                None => format!("Camera {:?}", state),
            },
            SignbuddyEvent::FrameSampled {
                sequence, frame_id, ..
            } => {
                format!("Frame {} sampled as #{}", frame_id, sequence)
            }
            SignbuddyEvent::DetectionUpdated {
                sequence,
                letter,
                confidence_percent,
                ..
            } => match letter {
                Some(letter) => format!(
                    "Detection #{}: {} ({:.1}%)",
                    sequence, letter, confidence_percent
                ),
                None => format!("Detection #{}: no sign", sequence),
            },
            SignbuddyEvent::StaleResponseDiscarded {
                sequence,
                highest_applied,
            } => {
                format!(
                    "Discarded response #{} (highest applied #{})",
                    sequence, highest_applied
                )
            }
            SignbuddyEvent::InferenceFailed { sequence, error } => {
                format!("Inference #{} failed: {}", sequence, error)
            }
            SignbuddyEvent::LetterScored {
                letter,
                progress,
                next_target,
                cycle_completed,
            } => {
                if *cycle_completed {
                    format!(
                        "Scored {} and completed the alphabet, next target {}",
                        letter, next_target
                    )
                } else {
                    format!(
                        "Scored {} ({} done), next target {}",
                        letter, progress, next_target
                    )
                }
            }
            SignbuddyEvent::LetterMismatch { detected, target } => {
                format!("Detected {} while practicing {}", detected, target)
            }
            SignbuddyEvent::CooldownExpired { target } => {
                format!("Cooldown expired, practicing {}", target)
            }
            SignbuddyEvent::TargetChanged { target } => format!("Target changed to {}", target),
            SignbuddyEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            SignbuddyEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SignbuddyEvent::CaptureStateChanged { .. } => "capture_state_changed",
            SignbuddyEvent::FrameSampled { .. } => "frame_sampled",
            SignbuddyEvent::DetectionUpdated { .. } => "detection_updated",
            SignbuddyEvent::StaleResponseDiscarded { .. } => "stale_response_discarded",
            SignbuddyEvent::InferenceFailed { .. } => "inference_failed",
            SignbuddyEvent::LetterScored { .. } => "letter_scored",
            SignbuddyEvent::LetterMismatch { .. } => "letter_mismatch",
            SignbuddyEvent::CooldownExpired { .. } => "cooldown_expired",
            SignbuddyEvent::TargetChanged { .. } => "target_changed",
            SignbuddyEvent::SystemError { .. } => "system_error",
            SignbuddyEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SignbuddyEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SignbuddyEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter applied on receive
    pub fn subscribe_filtered(&self, filter: EventFilter, name: &str) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.to_string())
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers; zero subscribers is not an error.
    pub fn publish(&self, event: SignbuddyEvent) -> usize {
        match &event {
            SignbuddyEvent::LetterScored { .. } | SignbuddyEvent::ShutdownRequested { .. } => {
                info!("{}", event.description());
            }
            SignbuddyEvent::CaptureStateChanged { error: Some(_), .. } => {
                warn!("{}", event.description());
            }
            SignbuddyEvent::InferenceFailed { .. } => {
                warn!("{}", event.description());
            }
            SignbuddyEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&SignbuddyEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &SignbuddyEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<SignbuddyEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<SignbuddyEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    ///
    /// Lagging is logged and skipped; only a closed bus ends the stream.
    pub async fn recv(&mut self) -> Result<SignbuddyEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus.publish(SignbuddyEvent::LetterMismatch {
            detected: 'B',
            target: 'A',
        });
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            SignbuddyEvent::LetterMismatch { detected, target } => {
                assert_eq!(detected, 'B');
                assert_eq!(target, 'A');
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(10);
        assert_eq!(
            event_bus.publish(SignbuddyEvent::CooldownExpired { target: 'C' }),
            0
        );
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_filtered(
            EventFilter::EventTypes(vec!["letter_scored"]),
            "scores",
        );

        event_bus.publish(SignbuddyEvent::FrameSampled {
            sequence: 1,
            frame_id: 10,
            timestamp: SystemTime::now(),
        });
        event_bus.publish(SignbuddyEvent::LetterScored {
            letter: 'A',
            progress: 1,
            next_target: 'Q',
            cycle_completed: false,
        });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type(), "letter_scored");
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::Custom(|event| {
            matches!(event, SignbuddyEvent::InferenceFailed { .. })
        });

        assert!(filter.matches(&SignbuddyEvent::InferenceFailed {
            sequence: 3,
            error: "timeout".to_string(),
        }));
        assert!(!filter.matches(&SignbuddyEvent::TargetChanged { target: 'D' }));
        assert!(EventFilter::All.matches(&SignbuddyEvent::TargetChanged { target: 'D' }));
    }

    #[test]
    fn test_event_descriptions() {
        let event = SignbuddyEvent::DetectionUpdated {
            sequence: 4,
            letter: Some('L'),
            confidence_percent: 91.3,
            highlight: true,
        };
        assert_eq!(event.description(), "Detection #4: L (91.3%)");

        let event = SignbuddyEvent::DetectionUpdated {
            sequence: 5,
            letter: None,
            confidence_percent: 0.0,
            highlight: false,
        };
        assert_eq!(event.description(), "Detection #5: no sign");
    }
}
