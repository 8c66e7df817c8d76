use super::client::DetectionService;
use super::protocol::{DetectRequest, DetectResponseBody};
use crate::error::InferenceError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Scripted = (Result<DetectResponseBody, InferenceError>, Duration);

/// Detection service answering from a script, then from a fallback
pub struct ScriptedService {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Result<DetectResponseBody, InferenceError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<DetectRequest>>,
}

impl ScriptedService {
    pub fn new(fallback: Result<DetectResponseBody, InferenceError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn always(letter: char, confidence: f64) -> Self {
        Self::new(Ok(DetectResponseBody::detected(letter, confidence)))
    }

    pub fn push(&self, answer: Result<DetectResponseBody, InferenceError>) {
        self.push_delayed(answer, Duration::ZERO);
    }

    pub fn push_delayed(&self, answer: Result<DetectResponseBody, InferenceError>, delay: Duration) {
        self.script.lock().push_back((answer, delay));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<DetectRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl DetectionService for ScriptedService {
    async fn detect(&self, request: DetectRequest) -> Result<DetectResponseBody, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request);

        let next = self.script.lock().pop_front();
        match next {
            Some((answer, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                answer
            }
            None => self.fallback.clone(),
        }
    }
}
