use super::handlers::{NO_HAND_MESSAGE, NO_IMAGE_MESSAGE};
use super::*;
use crate::config::SignbuddyConfig;
use crate::inference::{DetectResponseBody, InferenceOutcome};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tower::ServiceExt;

const IMAGE: &str = "data:image/jpeg;base64,/9j/AAAA";

fn detect_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn detect(app: Router, uri: &str, body: String) -> DetectResponseBody {
    let (status, bytes) = call(app, detect_request(uri, body)).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_detect_returns_valid_letter() {
    let app = router(0.0, StdRng::seed_from_u64(3));
    let body = detect(app, "/detect", format!(r#"{{"image": "{}"}}"#, IMAGE)).await;

    assert!(body.success);
    assert!(body.error.is_none());
    match body.clone().interpret() {
        InferenceOutcome::Detected(response) => {
            assert!(response.letter.unwrap().is_ascii_uppercase());
            assert!((0.0..=1.0).contains(&response.confidence));
        }
        other => panic!("Expected a detection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_api_detect_alias() {
    let app = router(0.0, StdRng::seed_from_u64(5));
    let body = detect(app, "/api/detect", format!(r#"{{"image": "{}"}}"#, IMAGE)).await;

    assert!(body.success);
}

#[tokio::test]
async fn test_no_hand_answer() {
    let app = router(1.0, StdRng::seed_from_u64(3));
    let body = detect(app, "/detect", format!(r#"{{"image": "{}"}}"#, IMAGE)).await;

    assert_eq!(body, DetectResponseBody::rejected(NO_HAND_MESSAGE));
    assert_eq!(body.interpret(), InferenceOutcome::NoDetection);
}

#[tokio::test]
async fn test_missing_image_is_rejected() {
    for payload in [r#"{}"#, r#"{"image": "hello"}"#, "not json"] {
        let app = router(0.0, StdRng::seed_from_u64(3));
        let body = detect(app, "/detect", payload.to_string()).await;

        assert_eq!(body, DetectResponseBody::rejected(NO_IMAGE_MESSAGE), "{}", payload);
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = router(0.2, StdRng::seed_from_u64(3));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, bytes) = call(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"ok");
}

#[tokio::test]
async fn test_server_shuts_down_on_cancel() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let cancel = tokio_util::sync::CancellationToken::new();

    let task = tokio::spawn(serve(
        listener,
        router(0.0, StdRng::seed_from_u64(1)),
        cancel.clone(),
    ));

    cancel.cancel();
    task.await.unwrap().unwrap();
}

#[test]
fn test_server_address_from_config() {
    let server = StubServer::new(SignbuddyConfig::default().stub);
    assert_eq!(server.address(), "127.0.0.1:3001");
}
