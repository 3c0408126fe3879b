//! Configuration Module - TOML-based Desk Configuration
//!
//! Loads and validates configuration from `config.toml`. All endpoints,
//! the contract module address, and display cadences are externalized
//! here - nothing is hardcoded in the domain layer.

pub mod loader;

use serde::Deserialize;

/// Top-level desk configuration.
///
/// Loaded from `config.toml` at startup and validated before any
/// connection is opened.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Client identity and logging.
    pub client: ClientConfig,
    /// Backend order-construction API.
    pub api: ApiConfig,
    /// Chain fullnode and contract addresses.
    pub chain: ChainConfig,
    /// External wallet provider endpoint.
    pub wallet: WalletConfig,
    /// Vendor market-data feed.
    pub feed: FeedConfig,
    /// Display buffer cadences.
    pub display: DisplayConfig,
    /// Submission pipeline tuning.
    pub trade: TradeConfig,
    /// Health and metrics endpoint.
    pub metrics: MetricsConfig,
    /// Tradable market definitions.
    pub markets: Vec<MarketEntry>,
}

/// Client identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Human-readable client name.
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Backend REST API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL.
    pub base_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum retries on transient errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between retries (milliseconds, exponential backoff).
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

/// Chain fullnode configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Fullnode REST endpoint.
    pub node_url: String,
    /// Deployed perps module address (0x-prefixed).
    pub module_address: String,
    /// Program admin address, forwarded in open-position argument lists.
    pub admin_address: String,
    /// Expected chain id, validated at startup.
    pub chain_id: u64,
}

/// External wallet provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Wallet provider endpoint (local signer daemon).
    pub url: String,
    /// Timeout for signature requests in milliseconds. Generous: the
    /// user may take a while to approve.
    #[serde(default = "default_sign_timeout_ms")]
    pub sign_timeout_ms: u64,
}

/// Vendor market-data feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Vendor REST base URL for snapshots.
    pub rest_url: String,
    /// Vendor WebSocket base URL for streams.
    pub ws_url: String,
    /// Candle interval, vendor notation (e.g. "1h").
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,
    /// Depth levels requested from REST snapshots.
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,
}

/// Display buffer cadences (~1s book, ~500ms price).
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Book rows shown per side; doubles as the completeness threshold.
    #[serde(default = "default_book_rows")]
    pub book_rows: usize,
    /// Minimum interval between book publishes (milliseconds).
    #[serde(default = "default_book_interval_ms")]
    pub book_interval_ms: u64,
    /// Minimum interval between trade-price publishes (milliseconds).
    #[serde(default = "default_price_interval_ms")]
    pub price_interval_ms: u64,
    /// Candles kept in the rolling series.
    #[serde(default = "default_candle_history")]
    pub candle_history: usize,
}

/// Submission pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeConfig {
    /// Delay before the optimistic position sync (milliseconds), giving
    /// the chain time to index the transaction.
    #[serde(default = "default_sync_delay_ms")]
    pub sync_delay_ms: u64,
    /// Maximum cached-price age accepted when a refresh fails (seconds).
    #[serde(default = "default_max_price_age_secs")]
    pub max_price_age_secs: i64,
}

/// Health and metrics endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bind address for /live, /ready and /metrics.
    #[serde(default = "default_metrics_addr")]
    pub bind_address: String,
}

/// One tradable market and its vendor feed mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketEntry {
    /// Chain market id.
    pub id: u64,
    /// Display symbol, e.g. "BTC/USDT".
    pub symbol: String,
    /// Vendor stream symbol, e.g. "BTCUSDT".
    pub feed_symbol: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_sign_timeout_ms() -> u64 {
    120_000
}

fn default_kline_interval() -> String {
    "1h".to_string()
}

fn default_depth_limit() -> usize {
    20
}

fn default_book_rows() -> usize {
    12
}

fn default_book_interval_ms() -> u64 {
    1_000
}

fn default_price_interval_ms() -> u64 {
    500
}

fn default_candle_history() -> usize {
    500
}

fn default_sync_delay_ms() -> u64 {
    2_000
}

fn default_max_price_age_secs() -> i64 {
    60
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}
