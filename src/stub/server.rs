use crate::config::StubConfig;
use crate::error::{Result, SignbuddyError};
use axum::{
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::{detect_handler, health_handler};

/// Shared state for the Axum server
#[derive(Clone)]
pub struct StubState {
    pub(crate) rng: Arc<Mutex<StdRng>>,
    pub(crate) no_hand_probability: f64,
}

/// Development stand-in for the sign detection service
///
/// Answers every request with a random letter and confidence, or with the
/// "no hand" rejection, so the client can be exercised without a model.
pub struct StubServer {
    pub(crate) config: StubConfig,
}

impl StubServer {
    pub fn new(config: StubConfig) -> Self {
        Self { config }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.port)
    }

    pub fn router(&self) -> Router {
        router(self.config.no_hand_probability, StdRng::from_entropy())
    }

    /// Bind the configured address and serve until cancelled
    pub async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let addr = self.address();

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            SignbuddyError::component("stub_server", format!("failed to bind {}: {}", addr, e))
        })?;

        info!("Stub detection server listening on {}", addr);
        serve(listener, self.router(), cancel).await
    }
}

/// Routes of the stub service; the RNG is injectable for tests
pub fn router(no_hand_probability: f64, rng: StdRng) -> Router {
    let state = StubState {
        rng: Arc::new(Mutex::new(rng)),
        no_hand_probability,
    };

    Router::new()
        .route("/detect", post(detect_handler))
        .route("/api/detect", post(detect_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, app: Router, cancel: CancellationToken) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| SignbuddyError::component("stub_server", format!("server error: {}", e)))?;

    info!("Stub detection server stopped");
    Ok(())
}
