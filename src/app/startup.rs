use super::orchestrator::{CAMERA, DETECTION, DISPLAY, KEYBOARD};
use super::{ComponentState, SignbuddyOrchestrator};
use crate::display::StatusDisplay;
use crate::error::{Result, SignbuddyError};
use tracing::{error, info, warn};

impl SignbuddyOrchestrator {
    /// Register the components that will take part in this run
    pub fn initialize(&mut self) -> Result<()> {
        info!("Initializing SignBuddy components");

        self.set_component_state(CAMERA, ComponentState::Stopped);
        self.set_component_state(DETECTION, ComponentState::Stopped);

        if self.display_enabled {
            self.set_component_state(DISPLAY, ComponentState::Stopped);
        }
        if self.keyboard_enabled {
            self.set_component_state(KEYBOARD, ComponentState::Stopped);
        }
        #[cfg(feature = "stub-server")]
        if self.stub_enabled {
            self.set_component_state(super::orchestrator::STUB, ComponentState::Stopped);
        }

        info!(
            "Camera {} via {}, detection service at {}",
            self.config.camera.index,
            self.config.camera.source.as_str(),
            self.config.detection.endpoint()
        );
        Ok(())
    }

    /// Start all components
    ///
    /// A camera that cannot be opened does not fail startup: the capture
    /// stays in its error state and the user can retry from the keyboard.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting SignBuddy");

        #[cfg(feature = "stub-server")]
        if self.stub_enabled {
            self.start_stub_server();
        }

        self.set_component_state(DETECTION, ComponentState::Starting);
        let detection_loop = self.detection_loop.take().ok_or_else(|| {
            SignbuddyError::component(DETECTION, "detection loop already started")
        })?;
        let cancel = self.cancellation_token.child_token();
        self.tasks
            .insert(DETECTION, tokio::spawn(detection_loop.run(cancel)));
        self.set_component_state(DETECTION, ComponentState::Running);

        if self.display_enabled {
            let display = StatusDisplay::new(self.detection_handle.view());
            let cancel = self.cancellation_token.child_token();
            self.tasks.insert(DISPLAY, tokio::spawn(display.run(cancel)));
            self.set_component_state(DISPLAY, ComponentState::Running);
        }

        self.set_component_state(CAMERA, ComponentState::Starting);
        match self.capture.start().await {
            Ok(state) => {
                self.set_component_state(CAMERA, ComponentState::Running);
                info!("Camera {:?}", state);
            }
            Err(e) => {
                self.set_component_state(CAMERA, ComponentState::Failed);
                warn!("{} ({})", e.user_message(), e);
            }
        }

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                self.set_component_state(KEYBOARD, ComponentState::Starting);

                keyboard_handler.start().await.map_err(|e| {
                    error!("Failed to start keyboard handler: {}", e);
                    e
                })?;

                self.set_component_state(KEYBOARD, ComponentState::Running);
            }
        }

        info!("SignBuddy started");
        Ok(())
    }

    #[cfg(feature = "stub-server")]
    fn start_stub_server(&mut self) {
        use super::orchestrator::STUB;
        use crate::stub::StubServer;

        self.set_component_state(STUB, ComponentState::Starting);

        let server = StubServer::new(self.config.stub.clone());
        let cancel = self.cancellation_token.child_token();
        let event_bus = self.event_bus();
        self.tasks.insert(
            STUB,
            tokio::spawn(async move {
                if let Err(e) = server.start(cancel).await {
                    error!("Stub detection server error: {}", e);
                    event_bus.publish(crate::events::SignbuddyEvent::SystemError {
                        component: STUB.to_string(),
                        error: e.to_string(),
                    });
                }
            }),
        );

        self.set_component_state(STUB, ComponentState::Running);
        info!(
            "Stub detection server started on {}:{}",
            self.config.stub.ip, self.config.stub.port
        );
    }
}
