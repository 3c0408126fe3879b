//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready endpoints via axum 0.7. Readiness depends
//! on backend reachability and feed connectivity.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::watch;
use tracing::{info, instrument};

/// Shared health state polled by readiness probes.
#[derive(Debug, Clone)]
pub struct HealthState {
    /// Whether the backend answers its health endpoint.
    pub backend_healthy: Arc<std::sync::atomic::AtomicBool>,
    /// Whether the market-data feed is connected.
    pub feed_healthy: Arc<std::sync::atomic::AtomicBool>,
}

impl HealthState {
    /// Create a new health state (all healthy by default).
    pub fn new() -> Self {
        Self {
            backend_healthy: Arc::new(std::sync::atomic::AtomicBool::new(true)),
            feed_healthy: Arc::new(std::sync::atomic::AtomicBool::new(true)),
        }
    }

    /// Check if the desk is ready to serve traffic.
    pub fn is_ready(&self) -> bool {
        use std::sync::atomic::Ordering;
        self.backend_healthy.load(Ordering::Relaxed) && self.feed_healthy.load(Ordering::Relaxed)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    /// Health state shared with all components.
    state: Arc<HealthState>,
    /// Bind port.
    port: u16,
}

impl HealthServer {
    pub fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the health check server until shutdown.
    #[instrument(skip(self, shutdown))]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(Arc::clone(&self.state));

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: returns 200 only if backend and feed are healthy.
    async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_readiness_tracks_components() {
        let state = HealthState::new();
        assert!(state.is_ready());
        state.feed_healthy.store(false, Ordering::Relaxed);
        assert!(!state.is_ready());
        state.feed_healthy.store(true, Ordering::Relaxed);
        state.backend_healthy.store(false, Ordering::Relaxed);
        assert!(!state.is_ready());
    }
}
