use super::orchestrator::{CAMERA, DETECTION, DISPLAY, KEYBOARD};
use super::{ComponentState, SignbuddyOrchestrator};
use crate::error::{Result, SignbuddyError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl SignbuddyOrchestrator {
    /// Perform graceful shutdown of all components
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if self.keyboard_enabled {
            if let Err(e) = self.stop_keyboard().await {
                error!("Error stopping keyboard: {}", e);
                exit_code = 1;
            }
        }

        // Tasks first, so the detection loop has torn down sampling before the camera goes
        for component in [DISPLAY, DETECTION] {
            if let Err(e) = self.stop_task(component).await {
                error!("Error stopping {}: {}", component, e);
                exit_code = 1;
            }
        }

        self.set_component_state(CAMERA, ComponentState::Stopping);
        self.capture.stop();
        self.set_component_state(CAMERA, ComponentState::Stopped);

        #[cfg(feature = "stub-server")]
        if let Err(e) = self.stop_task(super::orchestrator::STUB).await {
            error!("Error stopping stub server: {}", e);
            exit_code = 1;
        }

        let stats = self.client.stats();
        info!(
            "Detection requests: {} sent, {} letters, {} failures",
            stats.requests, stats.detections, stats.failures
        );
        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_keyboard(&self) -> Result<()> {
        let keyboard_handler = match &self.keyboard_handler {
            Some(handler) => handler,
            None => return Ok(()),
        };

        self.set_component_state(KEYBOARD, ComponentState::Stopping);
        match timeout(Duration::from_secs(2), keyboard_handler.stop()).await {
            Ok(Ok(())) => {
                self.set_component_state(KEYBOARD, ComponentState::Stopped);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(KEYBOARD, ComponentState::Failed);
                Err(e)
            }
            Err(_) => {
                self.set_component_state(KEYBOARD, ComponentState::Failed);
                Err(SignbuddyError::component(KEYBOARD, "stop timeout"))
            }
        }
    }

    /// Wait for a cancelled background task to finish
    async fn stop_task(&mut self, component: &'static str) -> Result<()> {
        let handle = match self.tasks.remove(component) {
            Some(handle) => handle,
            None => return Ok(()),
        };

        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping);

        match timeout(TASK_STOP_TIMEOUT, handle).await {
            Ok(Ok(())) => {
                self.set_component_state(component, ComponentState::Stopped);
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(component, ComponentState::Failed);
                Err(SignbuddyError::component(component, e.to_string()))
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed);
                Err(SignbuddyError::component(component, "stop timeout"))
            }
        }
    }
}
