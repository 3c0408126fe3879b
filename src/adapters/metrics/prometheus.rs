//! Prometheus Metrics Registry - Trading Desk Observability
//!
//! Registers and exposes Prometheus metrics for the desk: submission
//! pipeline outcomes, feed connectivity, and display publish counts.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use tokio::sync::watch;
use tracing::{info, instrument};

/// Centralized Prometheus metrics for the desk.
///
/// All metrics follow the naming convention `perps_desk_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Submissions entering the pipeline.
    pub submissions_started: IntCounter,
    /// Submissions reaching broadcast acceptance.
    pub submissions_confirmed: IntCounter,
    /// Submissions that failed at any stage.
    pub submissions_failed: IntCounter,
    /// Feed connection status (1 = connected, 0 = disconnected).
    pub feed_connected: IntGaugeVec,
    /// Snapshots released to the display layer.
    pub display_publishes: IntCounterVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions_started = IntCounter::new(
            "perps_desk_submissions_started_total",
            "Order submissions entering the pipeline",
        )?;

        let submissions_confirmed = IntCounter::new(
            "perps_desk_submissions_confirmed_total",
            "Submissions accepted for broadcast",
        )?;

        let submissions_failed = IntCounter::new(
            "perps_desk_submissions_failed_total",
            "Submissions that failed at any pipeline stage",
        )?;

        let feed_connected = IntGaugeVec::new(
            Opts::new(
                "perps_desk_feed_connected",
                "Feed connection status (1=connected, 0=disconnected)",
            ),
            &["symbol"],
        )?;

        let display_publishes = IntCounterVec::new(
            Opts::new(
                "perps_desk_display_publishes_total",
                "Snapshots released to the display layer",
            ),
            &["symbol", "kind"],
        )?;

        // Register all metrics
        registry.register(Box::new(submissions_started.clone()))?;
        registry.register(Box::new(submissions_confirmed.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(feed_connected.clone()))?;
        registry.register(Box::new(display_publishes.clone()))?;

        Ok(Self {
            registry,
            submissions_started,
            submissions_confirmed,
            submissions_failed,
            feed_connected,
            display_publishes,
        })
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let registry = metrics_self.registry.clone();
                async move {
                    let encoder = TextEncoder::new();
                    let metric_families = registry.gather();
                    let mut buffer = Vec::new();
                    encoder.encode(&metric_families, &mut buffer).unwrap();
                    String::from_utf8(buffer).unwrap_or_default()
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;

        Ok(())
    }
}
