//! Market data port - Vendor feed interface.
//!
//! REST snapshots seed the display state; streamed events keep it
//! current. Subscriptions are broadcast receivers so any number of
//! display buffers can attach without touching transport details.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::book::DepthSnapshot;
use crate::domain::candle::Candle;

/// A single trade print from the vendor stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTick {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    pub timestamp_ms: u64,
}

/// Trait for vendor market-data sources.
///
/// One instance serves exactly one symbol; a symbol change means
/// constructing a fresh source (feed disconnects are not retried).
#[async_trait]
pub trait MarketDataSource: Send + Sync + 'static {
    /// REST snapshot of the order book, truncated to `rows` levels.
    async fn depth_snapshot(&self, rows: usize) -> anyhow::Result<DepthSnapshot>;

    /// REST snapshot of historical candles, oldest first.
    async fn candles(&self, limit: usize) -> anyhow::Result<Vec<Candle>>;

    fn subscribe_depth(&self) -> broadcast::Receiver<DepthSnapshot>;

    fn subscribe_trades(&self) -> broadcast::Receiver<TradeTick>;

    fn subscribe_candles(&self) -> broadcast::Receiver<Candle>;
}
