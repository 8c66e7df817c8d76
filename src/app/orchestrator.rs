use super::types::{ComponentState, ShutdownReason};
use crate::camera::{device_for_source, CameraDevice, MediaCapture};
use crate::config::SignbuddyConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::inference::{DetectionService, HttpDetectionService, InferenceClient};
use crate::keyboard_input::KeyboardInputHandler;
use crate::pipeline::{DetectionLoop, DetectionLoopHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(super) const CAMERA: &str = "camera";
pub(super) const DETECTION: &str = "detection";
pub(super) const DISPLAY: &str = "display";
pub(super) const KEYBOARD: &str = "keyboard";
#[cfg(feature = "stub-server")]
pub(super) const STUB: &str = "stub";

/// Wires the practice client together and drives its lifecycle
pub struct SignbuddyOrchestrator {
    pub(super) config: SignbuddyConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) capture: Arc<MediaCapture>,
    pub(super) client: Arc<InferenceClient>,

    // Components
    pub(super) detection_loop: Option<DetectionLoop>,
    pub(super) detection_handle: DetectionLoopHandle,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,
    pub(super) display_enabled: bool,
    #[cfg(feature = "stub-server")]
    pub(super) stub_enabled: bool,
    pub(super) tasks: HashMap<&'static str, JoinHandle<()>>,

    // Lifecycle management
    pub(super) component_states: Mutex<HashMap<String, ComponentState>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl SignbuddyOrchestrator {
    /// Create an orchestrator using the configured camera and HTTP detection service
    pub fn new(config: SignbuddyConfig) -> Result<Self> {
        let device = device_for_source(config.camera.source)?;
        let service = Arc::new(HttpDetectionService::new(&config.detection));
        Ok(Self::with_components(config, device, service))
    }

    /// Create an orchestrator around explicit camera and detection backends
    pub fn with_components(
        config: SignbuddyConfig,
        device: Arc<dyn CameraDevice>,
        service: Arc<dyn DetectionService>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let capture = Arc::new(MediaCapture::new(config.camera.clone(), device));
        let client = Arc::new(InferenceClient::new(service));

        let (detection_loop, detection_handle) = DetectionLoop::new(
            &config,
            Arc::clone(&capture),
            Arc::clone(&client),
            Arc::clone(&event_bus),
        );

        let keyboard_handler = Some(KeyboardInputHandler::new(
            Arc::clone(&event_bus),
            detection_handle.clone(),
        ));

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            event_bus,
            capture,
            client,
            detection_loop: Some(detection_loop),
            detection_handle,
            keyboard_handler,
            keyboard_enabled: false,
            display_enabled: false,
            #[cfg(feature = "stub-server")]
            stub_enabled: false,
            tasks: HashMap::new(),
            component_states: Mutex::new(HashMap::new()),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Terminal keyboard controls (off by default)
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    /// Terminal status line (off by default)
    pub fn set_display_enabled(&mut self, enabled: bool) {
        self.display_enabled = enabled;
    }

    /// Serve the stub detection service next to the client
    #[cfg(feature = "stub-server")]
    pub fn set_stub_enabled(&mut self, enabled: bool) {
        self.stub_enabled = enabled;
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn capture(&self) -> Arc<MediaCapture> {
        Arc::clone(&self.capture)
    }

    pub fn detection(&self) -> DetectionLoopHandle {
        self.detection_handle.clone()
    }

    pub fn client(&self) -> Arc<InferenceClient> {
        Arc::clone(&self.client)
    }

    pub fn config(&self) -> &SignbuddyConfig {
        &self.config
    }

    pub fn set_component_state(&self, component: &str, state: ComponentState) {
        debug!("Component '{}' is now {}", component, state);
        self.component_states
            .lock()
            .insert(component.to_string(), state);
    }

    pub fn component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().get(component).copied()
    }

    pub fn component_states(&self) -> HashMap<String, ComponentState> {
        self.component_states.lock().clone()
    }
}
