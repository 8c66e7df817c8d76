use super::mock::ScriptedService;
use super::*;
use crate::config::{DetectionConfig, SignbuddyConfig};
use crate::error::{InferenceError, DETECTION_SERVICE_MESSAGE};
use crate::frame::{EncodedFrame, JPEG_DATA_URL_PREFIX};
use std::sync::Arc;
use std::time::SystemTime;

fn create_test_frame(sequence: u64) -> EncodedFrame {
    EncodedFrame {
        sequence,
        captured_at: SystemTime::now(),
        width: 4,
        height: 4,
        data_url: format!("{}/9j/AAAA", JPEG_DATA_URL_PREFIX),
    }
}

fn detection_config(base_url: String) -> DetectionConfig {
    let mut config = SignbuddyConfig::default().detection;
    config.base_url = base_url;
    config.request_timeout_ms = 2000;
    config
}

#[tokio::test]
async fn test_detect_forwards_data_url() {
    let service = Arc::new(ScriptedService::always('A', 0.9));
    let client = InferenceClient::new(service.clone());

    let outcome = client.detect(&create_test_frame(1)).await;

    assert_eq!(
        outcome,
        InferenceOutcome::Detected(DetectionResponse {
            letter: Some('A'),
            confidence: 0.9,
        })
    );

    let request = service.last_request().unwrap();
    assert!(request.image.starts_with(JPEG_DATA_URL_PREFIX));
}

#[tokio::test]
async fn test_failures_are_values_not_errors() {
    let service = Arc::new(ScriptedService::new(Err(InferenceError::Transport {
        details: "connection refused".to_string(),
    })));
    let client = InferenceClient::new(service);

    let outcome = client.detect(&create_test_frame(1)).await;

    let error = outcome.error().unwrap();
    assert_eq!(error.user_message(), DETECTION_SERVICE_MESSAGE);
    assert!(outcome.response().is_none());
}

#[tokio::test]
async fn test_stats_count_each_outcome() {
    let service = Arc::new(ScriptedService::always('B', 0.8));
    service.push(Ok(DetectResponseBody::rejected("No hand detected")));
    service.push(Err(InferenceError::Status { status: 503 }));
    let client = InferenceClient::new(service.clone());

    for sequence in 1..=3 {
        client.detect(&create_test_frame(sequence)).await;
    }

    assert_eq!(
        client.stats(),
        InferenceStats {
            requests: 3,
            detections: 1,
            failures: 1,
        }
    );
    assert_eq!(service.call_count(), 3);
}

#[tokio::test]
async fn test_unreachable_service_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = InferenceClient::http(&detection_config(format!("http://{}", addr)));
    let outcome = client.detect(&create_test_frame(1)).await;

    match outcome {
        InferenceOutcome::Failed(InferenceError::Transport { .. }) => {}
        other => panic!("Expected transport failure, got {:?}", other),
    }
}

#[test]
fn test_http_service_targets_configured_endpoint() {
    let mut config = detection_config("http://localhost:5000/".to_string());
    config.detect_path = "api/detect".to_string();

    let service = HttpDetectionService::new(&config);
    assert_eq!(service.endpoint(), "http://localhost:5000/api/detect");
}

#[cfg(feature = "stub-server")]
mod http {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_round_trip() {
        let router = Router::new().route(
            "/detect",
            post(|Json(request): Json<DetectRequest>| async move {
                assert!(request.image.starts_with(JPEG_DATA_URL_PREFIX));
                Json(DetectResponseBody::detected('L', 0.88))
            }),
        );
        let base_url = serve(router).await;

        let client = InferenceClient::http(&detection_config(base_url));
        let outcome = client.detect(&create_test_frame(1)).await;

        assert_eq!(outcome.response().and_then(|r| r.letter), Some('L'));
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let router = Router::new().route(
            "/detect",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base_url = serve(router).await;

        let client = InferenceClient::http(&detection_config(base_url));
        let outcome = client.detect(&create_test_frame(1)).await;

        assert_eq!(
            outcome,
            InferenceOutcome::Failed(InferenceError::Status { status: 500 })
        );
    }

    #[tokio::test]
    async fn test_http_garbage_body_is_a_parse_failure() {
        let router = Router::new().route("/detect", post(|| async { "not json" }));
        let base_url = serve(router).await;

        let client = InferenceClient::http(&detection_config(base_url));
        let outcome = client.detect(&create_test_frame(1)).await;

        assert!(matches!(
            outcome,
            InferenceOutcome::Failed(InferenceError::Parse { .. })
        ));
    }
}
