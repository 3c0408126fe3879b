//! Perps Desk — Entry Point
//!
//! Initializes configuration, logging, the backend client, fullnode and
//! wallet connections, and the per-market display plumbing. Runs until
//! SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create ApiClient / RestBackend (HTTP + retry)
//! 4. Connect FullnodeClient (chain-id validated)
//! 5. Create RemoteWallet + WalletSession (connect is best effort)
//! 6. Spawn health + metrics servers
//! 7. Spawn market-data feed + MarketView for the active market
//! 8. Spawn position refresh loop
//! 9. Wait for SIGINT, then graceful shutdown with timeouts

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::api::{ApiClient, ApiClientConfig, RestBackend};
use adapters::chain::{FullnodeClient, RemoteWallet};
use adapters::feeds::MarketDataFeed;
use adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use ports::backend::BackendApi;
use usecases::{MarketView, PositionBoard, SubmissionState, WalletSession};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config =
        config::loader::load_config("config.toml").context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.client.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.client.name,
        version = env!("CARGO_PKG_VERSION"),
        markets = config.markets.len(),
        "Starting perps desk"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── 4. Backend REST client with retry ───────────────────
    let api_client = Arc::new(
        ApiClient::new(ApiClientConfig::from_config(&config.api))
            .context("Failed to create backend client")?,
    );
    let backend = Arc::new(RestBackend::new(Arc::clone(&api_client)));

    // ── 5. Fullnode connection (validates chain id) ─────────
    let fullnode = Arc::new(
        FullnodeClient::connect(&config.chain)
            .await
            .context("Failed to connect to fullnode")?,
    );

    // ── 6. Wallet session (connect is best effort) ──────────
    let wallet =
        Arc::new(RemoteWallet::new(&config.wallet).context("Failed to create wallet adapter")?);
    let session = Arc::new(WalletSession::new(Arc::clone(&wallet)));
    if let Err(e) = session.connect().await {
        warn!(error = %e, "Wallet not connected at startup; trading disabled until connect");
    }

    let pipeline = Arc::new(usecases::SubmissionPipeline::new(
        Arc::clone(&backend),
        Arc::clone(&fullnode),
        Arc::clone(&wallet),
        &config,
    ));
    let board = Arc::new(PositionBoard::new(Arc::clone(&backend)));

    // ── 7. Health + metrics servers ─────────────────────────
    let health_state = Arc::new(HealthState::new());
    let health_server = HealthServer::new(Arc::clone(&health_state), 8080);
    let health_handle = tokio::spawn(health_server.run(shutdown_rx.clone()));

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let metrics_handle = if config.metrics.enabled {
        let bind = config.metrics.bind_address.clone();
        Some(tokio::spawn(
            Arc::clone(&metrics).serve(bind, shutdown_rx.clone()),
        ))
    } else {
        None
    };

    // Mirror pipeline state transitions into logs and counters.
    let mut state_rx = pipeline.subscribe();
    let state_metrics = Arc::clone(&metrics);
    let mut state_shutdown = shutdown_rx.clone();
    let state_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = state_shutdown.changed() => {
                    if *state_shutdown.borrow() {
                        break;
                    }
                }
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = state_rx.borrow_and_update().clone();
                    match state {
                        SubmissionState::BuildingPayload => {
                            state_metrics.submissions_started.inc();
                        }
                        SubmissionState::Confirmed { tx_hash } => {
                            state_metrics.submissions_confirmed.inc();
                            info!(%tx_hash, "Submission confirmed");
                        }
                        SubmissionState::Failed { reason } => {
                            state_metrics.submissions_failed.inc();
                            warn!(%reason, "Submission failed");
                        }
                        _ => {}
                    }
                }
            }
        }
    });

    // ── 8. Feed + market view for the active market ─────────
    let active = config
        .markets
        .iter()
        .find(|m| m.active)
        .context("No active market configured")?;

    let feed = Arc::new(
        MarketDataFeed::new(active.feed_symbol.clone(), &config.feed)
            .context("Failed to create market-data feed")?,
    );
    let view = Arc::new(MarketView::new(Arc::clone(&feed), &config.display));

    let feed_shutdown = shutdown_rx.clone();
    let feed_health = Arc::clone(&health_state);
    let feed_metrics = Arc::clone(&metrics);
    let feed_symbol = active.feed_symbol.clone();
    let feed_ref = Arc::clone(&feed);
    let feed_handle = tokio::spawn(async move {
        feed_metrics
            .feed_connected
            .with_label_values(&[&feed_symbol])
            .set(1);
        if let Err(e) = feed_ref.run(feed_shutdown).await {
            // Feed death is terminal; a symbol change builds a new feed.
            error!(symbol = %feed_symbol, error = %e, "Market-data feed failed");
        }
        feed_metrics
            .feed_connected
            .with_label_values(&[&feed_symbol])
            .set(0);
        feed_health
            .feed_healthy
            .store(false, std::sync::atomic::Ordering::Relaxed);
    });

    let view_shutdown = shutdown_rx.clone();
    let view_ref = Arc::clone(&view);
    let view_handle = tokio::spawn(async move {
        if let Err(e) = view_ref.run(view_shutdown).await {
            error!(error = %e, "Market view failed");
        }
    });

    // Count snapshots released to the display layer.
    let view_handle_rx = view.handle();
    let display_metrics = Arc::clone(&metrics);
    let display_symbol = active.feed_symbol.clone();
    let mut display_shutdown = shutdown_rx.clone();
    let display_handle = tokio::spawn(async move {
        let mut book_rx = view_handle_rx.book.clone();
        let mut price_rx = view_handle_rx.price.clone();
        loop {
            tokio::select! {
                biased;
                _ = display_shutdown.changed() => {
                    if *display_shutdown.borrow() {
                        break;
                    }
                }
                changed = book_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    display_metrics
                        .display_publishes
                        .with_label_values(&[&display_symbol, "book"])
                        .inc();
                }
                changed = price_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    display_metrics
                        .display_publishes
                        .with_label_values(&[&display_symbol, "price"])
                        .inc();
                }
            }
        }
    });

    // ── 9. Backend health probe + position refresh loop ─────
    let refresh_backend = Arc::clone(&backend);
    let refresh_board = Arc::clone(&board);
    let refresh_session = Arc::clone(&session);
    let refresh_health = Arc::clone(&health_state);
    let mut refresh_shutdown = shutdown_rx.clone();
    let refresh_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        loop {
            tokio::select! {
                biased;
                _ = refresh_shutdown.changed() => {
                    if *refresh_shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let healthy = refresh_backend.is_healthy().await;
                    refresh_health
                        .backend_healthy
                        .store(healthy, std::sync::atomic::Ordering::Relaxed);
                    if let Some(addr) = refresh_session.address() {
                        if let Err(e) = refresh_board.refresh(&addr).await {
                            warn!(error = %e, "Position refresh failed");
                        }
                    }
                }
            }
        }
    });

    info!("All tasks spawned — desk is running");

    // ── 10. Wait for SIGINT ─────────────────────────────────
    signal::ctrl_c().await.context("Signal handler failed")?;
    info!("SIGINT received, initiating graceful shutdown");

    let _ = shutdown_tx.send(true);

    // Readiness flips to 503 while tasks drain.
    health_state
        .backend_healthy
        .store(false, std::sync::atomic::Ordering::Relaxed);

    let _ = tokio::time::timeout(Duration::from_secs(5), view_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), feed_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), refresh_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), state_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), display_handle).await;
    health_handle.abort();
    if let Some(handle) = metrics_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}
