use super::{ShutdownReason, SignbuddyOrchestrator};
use crate::error::{Result, SignbuddyError};
use crate::events::{EventFilter, SignbuddyEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

type SharedSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl SignbuddyOrchestrator {
    /// Run until a signal or a shutdown request arrives, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("SignBuddy is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| SignbuddyError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| SignbuddyError::system("Shutdown receiver already taken"))?;

        let shutdown_sender: SharedSender = Arc::new(Mutex::new(Some(shutdown_sender)));
        self.setup_signal_handlers(&shutdown_sender);
        self.setup_shutdown_listener(&shutdown_sender);

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| SignbuddyError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("SignBuddy shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self, shutdown_sender: &SharedSender) {
        #[cfg(unix)]
        {
            let sender = Arc::clone(shutdown_sender);
            let cancel = self.cancellation_token.clone();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};

                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => {}
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        send_shutdown(&sender, ShutdownReason::Signal("SIGTERM"));
                    }
                }
            });
        }

        let sender = Arc::clone(shutdown_sender);
        let cancel = self.cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                Ok(()) = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    send_shutdown(&sender, ShutdownReason::Signal("SIGINT"));
                }
            }
        });
    }

    /// Turn `ShutdownRequested` events (quit key) into a shutdown
    fn setup_shutdown_listener(&self, shutdown_sender: &SharedSender) {
        let mut receiver = self.event_bus.subscribe_filtered(
            EventFilter::EventTypes(vec!["shutdown_requested"]),
            "shutdown_listener",
        );
        let sender = Arc::clone(shutdown_sender);
        let cancel = self.cancellation_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                event = receiver.recv() => {
                    if let Ok(SignbuddyEvent::ShutdownRequested { reason, .. }) = event {
                        send_shutdown(&sender, ShutdownReason::UserRequest(reason));
                    }
                }
            }
        });
    }
}

fn send_shutdown(sender: &SharedSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().take() {
        let _ = sender.send(reason);
    }
}
