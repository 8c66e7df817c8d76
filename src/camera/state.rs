use crate::error::CaptureError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Camera acquisition lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Uninitialized,
    Requesting,
    Streaming,
    Error,
    Stopped,
}

impl CaptureState {
    /// A start request while in this state is a no-op
    pub fn is_active(&self) -> bool {
        matches!(self, CaptureState::Requesting | CaptureState::Streaming)
    }
}

/// Observable snapshot of the capture lifecycle
#[derive(Debug, Clone)]
pub struct CaptureStatus {
    pub state: CaptureState,
    pub last_error: Option<CaptureError>,
    pub session_id: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

impl CaptureStatus {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Uninitialized,
            last_error: None,
            session_id: None,
            changed_at: Utc::now(),
        }
    }

    pub(crate) fn transition(&mut self, state: CaptureState) {
        self.state = state;
        self.changed_at = Utc::now();
    }

    /// Whether the UI should offer a "retry camera access" control
    pub fn retry_available(&self) -> bool {
        matches!(self.state, CaptureState::Error)
    }
}

impl Default for CaptureStatus {
    fn default() -> Self {
        Self::new()
    }
}
