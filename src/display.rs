use crate::camera::CaptureState;
use crate::view::PracticeView;
use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One-line text rendering of the practice view
pub fn render_status_line(view: &PracticeView) -> String {
    let camera = match view.capture_state {
        CaptureState::Uninitialized => "Camera idle",
        CaptureState::Requesting => "Requesting camera",
        CaptureState::Streaming => "Live",
        CaptureState::Error => "Camera error",
        CaptureState::Stopped => "Camera stopped",
    };

    let mut parts = vec![format!("[{}]", camera)];

    if let Some(message) = &view.camera_message {
        parts.push(message.clone());
    }
    if view.retry_available {
        parts.push("Press r to retry".to_string());
    }

    parts.push(format!("Sign: {}", view.target_letter));

    let detected = match (view.detected_letter, &view.confidence_text) {
        (Some(letter), Some(confidence)) => format!("Detected: {} ({})", letter, confidence),
        _ => "Detected: -".to_string(),
    };
    parts.push(detected);
    parts.push(format!("Progress: {}", view.progress_text));

    if let Some(feedback) = &view.feedback {
        parts.push(feedback.clone());
    }
    if let Some(error) = &view.error {
        parts.push(error.clone());
    }

    parts.join(" | ")
}

/// Redraws the terminal status line whenever the view changes
pub struct StatusDisplay {
    view: watch::Receiver<PracticeView>,
}

impl StatusDisplay {
    pub fn new(view: watch::Receiver<PracticeView>) -> Self {
        Self { view }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let mut stdout = io::stdout();

        loop {
            let view = self.view.borrow_and_update().clone();
            if let Err(e) = draw(&mut stdout, &view) {
                warn!("Failed to draw status line: {}", e);
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = self.view.changed() => {
                    if changed.is_err() {
                        debug!("View channel closed");
                        break;
                    }
                }
            }
        }

        let _ = execute!(stdout, Print("\r\n"));
    }
}

fn draw<W: Write>(out: &mut W, view: &PracticeView) -> io::Result<()> {
    let color = if view.retry_available || view.error.is_some() {
        Color::Red
    } else if view.positive_feedback || view.highlight {
        Color::Green
    } else {
        Color::Reset
    };

    execute!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        SetForegroundColor(color),
        Print(render_status_line(view)),
        ResetColor
    )
}
