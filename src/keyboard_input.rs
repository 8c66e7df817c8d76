use crate::error::Result;
use crate::events::{EventBus, SignbuddyEvent};
use crate::pipeline::{DetectionLoopHandle, LoopCommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Command(LoopCommand),
    Quit,
}

/// `r` retries the camera, `n` skips the target, `q`/`Esc`/Ctrl-C quit
pub fn action_for_key(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyAction> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(KeyAction::Quit),
        KeyCode::Char('r') | KeyCode::Char('R') => {
            Some(KeyAction::Command(LoopCommand::RetryCamera))
        }
        KeyCode::Char('n') | KeyCode::Char('N') => {
            Some(KeyAction::Command(LoopCommand::SkipTarget))
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Terminal controls for the practice session
pub struct KeyboardInputHandler {
    event_bus: Arc<EventBus>,
    detection: DetectionLoopHandle,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(event_bus: Arc<EventBus>, detection: DetectionLoopHandle) -> Self {
        Self {
            event_bus,
            detection,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - r: retry camera, n: next letter, q: quit");

        let event_bus = Arc::clone(&self.event_bus);
        let detection = self.detection.clone();
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) if key_event.kind == KeyEventKind::Press => {
                                key_event
                            }
                            _ => continue,
                        };

                        match action_for_key(key_event.code, key_event.modifiers) {
                            Some(KeyAction::Command(command)) => {
                                debug!("Key {:?} -> {:?}", key_event.code, command);
                                let detection = detection.clone();
                                runtime_handle.spawn(async move {
                                    if let Err(e) = detection.send(command).await {
                                        warn!("Failed to send {:?}: {}", command, e);
                                    }
                                });
                            }
                            Some(KeyAction::Quit) => {
                                info!("Quit key pressed - requesting shutdown");
                                event_bus.publish(SignbuddyEvent::ShutdownRequested {
                                    timestamp: SystemTime::now(),
                                    reason: "User requested via keyboard".to_string(),
                                });
                                break;
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }
        });

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the poll loop one timeout period to notice and restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        let none = KeyModifiers::NONE;

        assert_eq!(
            action_for_key(KeyCode::Char('r'), none),
            Some(KeyAction::Command(LoopCommand::RetryCamera))
        );
        assert_eq!(
            action_for_key(KeyCode::Char('N'), KeyModifiers::SHIFT),
            Some(KeyAction::Command(LoopCommand::SkipTarget))
        );
        assert_eq!(action_for_key(KeyCode::Char('q'), none), Some(KeyAction::Quit));
        assert_eq!(action_for_key(KeyCode::Esc, none), Some(KeyAction::Quit));
        assert_eq!(
            action_for_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(KeyAction::Quit)
        );
        assert_eq!(action_for_key(KeyCode::Char('c'), none), None);
        assert_eq!(action_for_key(KeyCode::Char(' '), none), None);
    }
}
