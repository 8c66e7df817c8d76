use super::protocol::{DetectRequest, DetectResponseBody, InferenceOutcome};
use crate::config::DetectionConfig;
use crate::error::InferenceError;
use crate::frame::EncodedFrame;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Transport to the sign classification service
#[async_trait]
pub trait DetectionService: Send + Sync {
    async fn detect(&self, request: DetectRequest) -> Result<DetectResponseBody, InferenceError>;
}

/// JSON over HTTP, one blocking `ureq` call per request on the blocking pool
pub struct HttpDetectionService {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpDetectionService {
    pub fn new(config: &DetectionConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout())
            .build();

        Self {
            agent,
            endpoint: config.endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(
        agent: &ureq::Agent,
        endpoint: &str,
        request: &DetectRequest,
    ) -> Result<DetectResponseBody, InferenceError> {
        let response = agent
            .post(endpoint)
            .set("Content-Type", "application/json")
            .send_json(request)
            .map_err(|e| match e {
                ureq::Error::Status(status, _) => InferenceError::Status { status },
                ureq::Error::Transport(transport) => InferenceError::Transport {
                    details: transport.to_string(),
                },
            })?;

        let body = response.into_string().map_err(|e| InferenceError::Transport {
            details: format!("failed to read response body: {}", e),
        })?;

        serde_json::from_str(&body).map_err(|e| InferenceError::Parse {
            details: e.to_string(),
        })
    }
}

#[async_trait]
impl DetectionService for HttpDetectionService {
    async fn detect(&self, request: DetectRequest) -> Result<DetectResponseBody, InferenceError> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();

        tokio::task::spawn_blocking(move || Self::post(&agent, &endpoint, &request))
            .await
            .map_err(|e| InferenceError::Task {
                details: e.to_string(),
            })?
    }
}

/// Running totals for the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferenceStats {
    pub requests: u64,
    pub detections: u64,
    pub failures: u64,
}

/// Sends encoded frames to the detection service
///
/// Never fails across its boundary: every error becomes
/// [`InferenceOutcome::Failed`]. No retries, the next sampled frame is the retry.
pub struct InferenceClient {
    service: Arc<dyn DetectionService>,
    requests: AtomicU64,
    detections: AtomicU64,
    failures: AtomicU64,
}

impl InferenceClient {
    pub fn new(service: Arc<dyn DetectionService>) -> Self {
        Self {
            service,
            requests: AtomicU64::new(0),
            detections: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Client talking HTTP to `config.endpoint()`
    pub fn http(config: &DetectionConfig) -> Self {
        Self::new(Arc::new(HttpDetectionService::new(config)))
    }

    pub async fn detect(&self, frame: &EncodedFrame) -> InferenceOutcome {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let request = DetectRequest {
            image: frame.data_url.clone(),
        };

        let outcome = match self.service.detect(request).await {
            Ok(body) => {
                trace!("Detection #{} answered {:?}", frame.sequence, body);
                body.interpret()
            }
            Err(e) => {
                warn!("Detection request #{} failed: {}", frame.sequence, e);
                InferenceOutcome::Failed(e)
            }
        };

        match &outcome {
            InferenceOutcome::Detected(response) => {
                self.detections.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Detection #{}: {:?} at {:.2}",
                    frame.sequence, response.letter, response.confidence
                );
            }
            InferenceOutcome::Failed(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            InferenceOutcome::NoDetection => {
                debug!("Detection #{}: nothing recognized", frame.sequence);
            }
        }

        outcome
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            requests: self.requests.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
