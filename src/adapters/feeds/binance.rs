//! Binance Market-Data Feed
//!
//! One feed instance per display symbol. REST endpoints seed the order
//! book and candle history; a single combined-stream WebSocket carries
//! live depth snapshots, trades, and kline updates.
//!
//! A dropped connection is terminal for the instance: `run` returns an
//! error and subscribers observe channel closure. Switching symbols
//! means constructing a fresh feed, never resubscribing in place.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::domain::book::DepthSnapshot;
use crate::domain::candle::Candle;
use crate::ports::market_data::{MarketDataSource, TradeTick};

const CHANNEL_CAPACITY: usize = 256;

/// Live market-data feed for a single symbol.
pub struct MarketDataFeed {
    symbol: String,
    kline_interval: String,
    rest_url: String,
    ws_url: String,
    depth_limit: usize,
    http: reqwest::Client,
    depth_tx: broadcast::Sender<DepthSnapshot>,
    trade_tx: broadcast::Sender<TradeTick>,
    candle_tx: broadcast::Sender<Candle>,
}

impl MarketDataFeed {
    pub fn new(symbol: impl Into<String>, config: &FeedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build feed HTTP client")?;
        let (depth_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (trade_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (candle_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Ok(Self {
            symbol: symbol.into().to_uppercase(),
            kline_interval: config.kline_interval.clone(),
            rest_url: config.rest_url.trim_end_matches('/').to_string(),
            ws_url: config.ws_url.trim_end_matches('/').to_string(),
            depth_limit: config.depth_limit,
            http,
            depth_tx,
            trade_tx,
            candle_tx,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Run the WebSocket loop until shutdown. Returns `Err` when the
    /// connection drops; the caller decides what a dead feed means.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let stream_name = self.symbol.to_lowercase();
        let url = format!(
            "{}/stream?streams={s}@depth20@1000ms/{s}@trade/{s}@kline_{interval}",
            self.ws_url,
            s = stream_name,
            interval = self.kline_interval,
        );
        info!(symbol = %self.symbol, %url, "Connecting to market-data stream");

        let (ws, _) = connect_async(&url)
            .await
            .context("WebSocket connection failed")?;
        let (_, mut read) = ws.split();
        info!(symbol = %self.symbol, "Market-data stream connected");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(symbol = %self.symbol, "Feed shutting down");
                        return Ok(());
                    }
                }

                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = self.route_message(&text) {
                            debug!(symbol = %self.symbol, error = %e, "Skipped feed message");
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        warn!(symbol = %self.symbol, ?frame, "Feed closed by server");
                        anyhow::bail!("Market-data stream closed by server");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(symbol = %self.symbol, error = %e, "Feed read error");
                        return Err(e).context("Market-data stream read failed");
                    }
                    None => {
                        warn!(symbol = %self.symbol, "Feed stream ended");
                        anyhow::bail!("Market-data stream disconnected");
                    }
                }
            }
        }
    }

    fn route_message(&self, text: &str) -> Result<()> {
        let envelope: CombinedStreamMessage =
            serde_json::from_str(text).context("Malformed stream envelope")?;
        if envelope.stream.ends_with("@trade") {
            let event: TradeEvent =
                serde_json::from_value(envelope.data).context("Malformed trade event")?;
            let _ = self.trade_tx.send(event.into_tick(&self.symbol)?);
        } else if envelope.stream.contains("@depth") {
            let event: DepthEvent =
                serde_json::from_value(envelope.data).context("Malformed depth event")?;
            let snapshot = DepthSnapshot::from_raw(
                &self.symbol,
                &event.bids,
                &event.asks,
                self.depth_limit,
                chrono::Utc::now().timestamp_millis() as u64,
            );
            let _ = self.depth_tx.send(snapshot);
        } else if envelope.stream.contains("@kline") {
            let event: KlineEvent =
                serde_json::from_value(envelope.data).context("Malformed kline event")?;
            let _ = self.candle_tx.send(event.kline.into_candle()?);
        }
        Ok(())
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Feed request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("Feed returned error status: {url}"))?;
        response
            .json()
            .await
            .with_context(|| format!("Malformed feed response: {url}"))
    }
}

#[async_trait::async_trait]
impl MarketDataSource for MarketDataFeed {
    async fn depth_snapshot(&self, rows: usize) -> Result<DepthSnapshot> {
        let url = format!(
            "{}/api/v3/depth?symbol={}&limit={}",
            self.rest_url, self.symbol, self.depth_limit
        );
        let raw: RestDepth = self.fetch_json(&url).await?;
        Ok(DepthSnapshot::from_raw(
            &self.symbol,
            &raw.bids,
            &raw.asks,
            rows,
            chrono::Utc::now().timestamp_millis() as u64,
        ))
    }

    async fn candles(&self, limit: usize) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.rest_url, self.symbol, self.kline_interval, limit
        );
        let rows: Vec<Vec<serde_json::Value>> = self.fetch_json(&url).await?;
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            candles.push(parse_kline_row(&row)?);
        }
        Ok(candles)
    }

    fn subscribe_depth(&self) -> broadcast::Receiver<DepthSnapshot> {
        self.depth_tx.subscribe()
    }

    fn subscribe_trades(&self) -> broadcast::Receiver<TradeTick> {
        self.trade_tx.subscribe()
    }

    fn subscribe_candles(&self) -> broadcast::Receiver<Candle> {
        self.candle_tx.subscribe()
    }
}

// Wire types

#[derive(Debug, Deserialize)]
struct CombinedStreamMessage {
    stream: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RestDepth {
    bids: Vec<(String, String)>,
    asks: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct DepthEvent {
    bids: Vec<(String, String)>,
    asks: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct TradeEvent {
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    timestamp_ms: u64,
}

impl TradeEvent {
    fn into_tick(self, symbol: &str) -> Result<TradeTick> {
        Ok(TradeTick {
            symbol: symbol.to_string(),
            price: self.price.parse().context("Malformed trade price")?,
            quantity: self.quantity.parse().context("Malformed trade quantity")?,
            timestamp_ms: self.timestamp_ms,
        })
    }
}

#[derive(Debug, Deserialize)]
struct KlineEvent {
    #[serde(rename = "k")]
    kline: KlinePayload,
}

#[derive(Debug, Deserialize)]
struct KlinePayload {
    #[serde(rename = "t")]
    open_time_ms: i64,
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "v")]
    volume: String,
    #[serde(rename = "x")]
    closed: bool,
}

impl KlinePayload {
    fn into_candle(self) -> Result<Candle> {
        Ok(Candle {
            open_time: self.open_time_ms / 1000,
            open: self.open.parse().context("Malformed kline open")?,
            high: self.high.parse().context("Malformed kline high")?,
            low: self.low.parse().context("Malformed kline low")?,
            close: self.close.parse().context("Malformed kline close")?,
            volume: self.volume.parse().context("Malformed kline volume")?,
            closed: self.closed,
        })
    }
}

/// Binance kline rows are positional arrays; only the OHLCV columns
/// matter here.
fn parse_kline_row(row: &[serde_json::Value]) -> Result<Candle> {
    anyhow::ensure!(row.len() >= 6, "Kline row too short: {} columns", row.len());
    let open_time_ms = row[0]
        .as_i64()
        .context("Kline open time is not an integer")?;
    let field = |idx: usize, name: &str| -> Result<f64> {
        row[idx]
            .as_str()
            .with_context(|| format!("Kline {name} is not a string"))?
            .parse()
            .with_context(|| format!("Malformed kline {name}"))
    };
    Ok(Candle {
        open_time: open_time_ms / 1000,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
        closed: true,
    })
}
