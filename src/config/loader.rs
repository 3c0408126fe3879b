//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters, and
//! providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns a detailed error if the file is unreadable, the TOML fails to
/// parse, or a validation rule is violated.
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig =
        toml::from_str(&content).context("Failed to parse config.toml")?;

    validate_config(&config)?;

    info!(
        markets = config.markets.len(),
        backend = %config.api.base_url,
        node = %config.chain.node_url,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
    anyhow::ensure!(
        !config.markets.is_empty(),
        "At least one market must be configured"
    );

    for (i, market) in config.markets.iter().enumerate() {
        anyhow::ensure!(
            !market.symbol.is_empty(),
            "Market {} has empty symbol",
            i
        );
        anyhow::ensure!(
            !market.feed_symbol.is_empty(),
            "Market {} ({}) has empty feed_symbol",
            i,
            market.symbol
        );
    }

    let mut ids: Vec<u64> = config.markets.iter().map(|m| m.id).collect();
    ids.sort_unstable();
    ids.dedup();
    anyhow::ensure!(
        ids.len() == config.markets.len(),
        "Market ids must be unique"
    );

    // Endpoint validation
    anyhow::ensure!(
        !config.api.base_url.is_empty(),
        "Backend API base_url must not be empty"
    );
    anyhow::ensure!(
        !config.chain.node_url.is_empty(),
        "Fullnode node_url must not be empty"
    );
    anyhow::ensure!(
        config.chain.module_address.starts_with("0x"),
        "module_address must be 0x-prefixed, got {:?}",
        config.chain.module_address
    );
    anyhow::ensure!(
        config.chain.admin_address.starts_with("0x"),
        "admin_address must be 0x-prefixed, got {:?}",
        config.chain.admin_address
    );
    anyhow::ensure!(
        !config.wallet.url.is_empty(),
        "Wallet provider url must not be empty"
    );
    anyhow::ensure!(
        !config.feed.rest_url.is_empty() && !config.feed.ws_url.is_empty(),
        "Feed rest_url and ws_url must not be empty"
    );

    // Display validation
    anyhow::ensure!(
        config.display.book_rows > 0,
        "display.book_rows must be positive"
    );
    anyhow::ensure!(
        config.display.book_interval_ms > 0 && config.display.price_interval_ms > 0,
        "display intervals must be positive"
    );
    anyhow::ensure!(
        config.display.candle_history > 0,
        "display.candle_history must be positive"
    );

    // Trade validation
    anyhow::ensure!(
        config.trade.max_price_age_secs > 0,
        "trade.max_price_age_secs must be positive, got {}",
        config.trade.max_price_age_secs
    );

    Ok(())
}
