use super::server::StubState;
use crate::inference::DetectResponseBody;
use crate::practice::ALPHABET;
use axum::{extract::State, Json};
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info};

pub const NO_HAND_MESSAGE: &str = "No hand detected";
pub const NO_IMAGE_MESSAGE: &str = "No image data provided";

#[derive(Debug, Deserialize)]
pub struct StubDetectRequest {
    #[serde(default)]
    pub image: Option<String>,
}

/// Answer a detection request with a random classification
pub async fn detect_handler(
    State(state): State<StubState>,
    payload: Option<Json<StubDetectRequest>>,
) -> Json<DetectResponseBody> {
    let image = payload.and_then(|Json(request)| request.image);

    let has_image = image
        .as_deref()
        .map(|image| image.starts_with("data:image/") && image.contains(','))
        .unwrap_or(false);
    if !has_image {
        debug!("Stub detect request without image data");
        return Json(DetectResponseBody::rejected(NO_IMAGE_MESSAGE));
    }

    let answer = {
        let mut rng = state.rng.lock();
        if rng.gen_bool(state.no_hand_probability) {
            DetectResponseBody::rejected(NO_HAND_MESSAGE)
        } else {
            let letter = ALPHABET[rng.gen_range(0..ALPHABET.len())];
            DetectResponseBody::detected(letter, rng.gen_range(0.0..=1.0))
        }
    };

    info!(
        "Stub detection for {} byte image: {:?} ({:?})",
        image.as_deref().map(str::len).unwrap_or_default(),
        answer.letter,
        answer.confidence
    );

    Json(answer)
}

/// Health check endpoint
pub async fn health_handler() -> &'static str {
    "ok"
}
