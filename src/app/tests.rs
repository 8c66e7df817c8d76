use super::*;
use crate::camera::{CaptureState, SyntheticBehavior, SyntheticCamera};
use crate::config::{CameraSource, SignbuddyConfig};
use crate::events::SignbuddyEvent;
use crate::inference::mock::ScriptedService;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::timeout;

fn create_test_config() -> SignbuddyConfig {
    let mut config = SignbuddyConfig::default();
    config.camera.source = CameraSource::Synthetic;
    config.camera.resolution = (16, 12);
    config.sampler.sample_interval_ms = 20;
    config.practice.cooldown_ms = 100;
    config
}

fn create_orchestrator(camera: Arc<SyntheticCamera>) -> SignbuddyOrchestrator {
    SignbuddyOrchestrator::with_components(
        create_test_config(),
        camera,
        Arc::new(ScriptedService::always('A', 0.9)),
    )
}

#[test]
fn test_orchestrator_creation_with_synthetic_camera() {
    let orchestrator = SignbuddyOrchestrator::new(create_test_config()).unwrap();

    assert!(orchestrator.component_states().is_empty());
    assert_eq!(orchestrator.capture().state(), CaptureState::Uninitialized);
}

#[test]
fn test_component_state_management() {
    let mut orchestrator = create_orchestrator(Arc::new(SyntheticCamera::new()));
    orchestrator.initialize().unwrap();

    let states = orchestrator.component_states();
    assert_eq!(states.len(), 2);
    assert_eq!(
        orchestrator.component_state("camera"),
        Some(ComponentState::Stopped)
    );

    orchestrator.set_component_state("camera", ComponentState::Running);
    assert_eq!(
        orchestrator.component_state("camera"),
        Some(ComponentState::Running)
    );
    assert_eq!(orchestrator.component_state("keyboard"), None);
}

#[test]
fn test_optional_components_are_registered() {
    let mut orchestrator = create_orchestrator(Arc::new(SyntheticCamera::new()));
    orchestrator.set_keyboard_enabled(true);
    orchestrator.set_display_enabled(true);
    orchestrator.initialize().unwrap();

    assert_eq!(
        orchestrator.component_state("keyboard"),
        Some(ComponentState::Stopped)
    );
    assert_eq!(
        orchestrator.component_state("display"),
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_start_detects_and_shuts_down() {
    let camera = Arc::new(SyntheticCamera::new());
    let mut orchestrator = create_orchestrator(Arc::clone(&camera));
    orchestrator.initialize().unwrap();
    orchestrator.start().await.unwrap();

    assert_eq!(
        orchestrator.component_state("camera"),
        Some(ComponentState::Running)
    );
    assert_eq!(
        orchestrator.component_state("detection"),
        Some(ComponentState::Running)
    );

    let mut view = orchestrator.detection().view();
    timeout(Duration::from_secs(3), async {
        while view.borrow_and_update().detected_letter.is_none() {
            view.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(orchestrator.capture().state(), CaptureState::Stopped);
    assert_eq!(camera.release_count(), 1);
    assert_eq!(
        orchestrator.component_state("detection"),
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_denied_camera_does_not_fail_startup() {
    let camera = Arc::new(SyntheticCamera::with_behavior(
        SyntheticBehavior::DenyPermission,
    ));
    let mut orchestrator = create_orchestrator(camera);
    orchestrator.initialize().unwrap();
    orchestrator.start().await.unwrap();

    assert_eq!(
        orchestrator.component_state("camera"),
        Some(ComponentState::Failed)
    );
    assert_eq!(orchestrator.capture().state(), CaptureState::Error);
    assert!(orchestrator.capture().status().retry_available());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(orchestrator.client().stats().requests, 0);

    assert_eq!(orchestrator.shutdown().await.unwrap(), 0);
}

#[tokio::test]
async fn test_shutdown_requested_event_ends_run() {
    let mut orchestrator = create_orchestrator(Arc::new(SyntheticCamera::new()));
    orchestrator.initialize().unwrap();
    orchestrator.start().await.unwrap();

    let event_bus = orchestrator.event_bus();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        event_bus.publish(SignbuddyEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "test".to_string(),
        });
    });

    let exit_code = timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(orchestrator.capture().state(), CaptureState::Stopped);
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let mut orchestrator = create_orchestrator(Arc::new(SyntheticCamera::new()));
    orchestrator.initialize().unwrap();
    orchestrator.start().await.unwrap();

    assert!(orchestrator.start().await.is_err());

    orchestrator.shutdown().await.unwrap();
}
