//! Market View - Display State for One Symbol
//!
//! Seeds itself from REST snapshots, then drives throttled watch
//! channels from the live feed: the order book at the book cadence, the
//! last trade price at the price cadence, and the candle series as
//! buckets arrive. Dropping the watch receivers is all a consumer needs
//! to do to detach.
//!
//! The view dies with its feed. A disconnect surfaces as closed watch
//! channels; a fresh view is built when the user picks a symbol again.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::config::DisplayConfig;
use crate::domain::book::BookView;
use crate::domain::candle::{Candle, CandleSeries, CandleUpdate};
use crate::ports::market_data::MarketDataSource;

use crate::adapters::feeds::throttle::ThrottledStream;

/// Tick direction relative to the previously displayed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDirection {
    Up,
    Down,
    Flat,
}

/// Last trade price as shown in the header.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceDisplay {
    pub price: f64,
    pub direction: PriceDirection,
    pub timestamp_ms: u64,
}

impl PriceDisplay {
    fn next(previous: Option<&PriceDisplay>, price: f64, timestamp_ms: u64) -> Self {
        let direction = match previous {
            Some(p) if price > p.price => PriceDirection::Up,
            Some(p) if price < p.price => PriceDirection::Down,
            Some(_) => PriceDirection::Flat,
            None => PriceDirection::Flat,
        };
        Self {
            price,
            direction,
            timestamp_ms,
        }
    }
}

/// Receiver half handed to the display layer.
#[derive(Clone)]
pub struct MarketViewHandle {
    pub book: watch::Receiver<Option<BookView>>,
    pub price: watch::Receiver<Option<PriceDisplay>>,
    pub candles: watch::Receiver<Vec<Candle>>,
}

/// Drives display state for a single symbol.
pub struct MarketView<S> {
    source: Arc<S>,
    book_rows: usize,
    book_interval: Duration,
    price_interval: Duration,
    candle_history: usize,
    book_tx: watch::Sender<Option<BookView>>,
    price_tx: watch::Sender<Option<PriceDisplay>>,
    candles_tx: watch::Sender<Vec<Candle>>,
}

impl<S: MarketDataSource> MarketView<S> {
    pub fn new(source: Arc<S>, config: &DisplayConfig) -> Self {
        let (book_tx, _) = watch::channel(None);
        let (price_tx, _) = watch::channel(None);
        let (candles_tx, _) = watch::channel(Vec::new());
        Self {
            source,
            book_rows: config.book_rows,
            book_interval: Duration::from_millis(config.book_interval_ms),
            price_interval: Duration::from_millis(config.price_interval_ms),
            candle_history: config.candle_history,
            book_tx,
            price_tx,
            candles_tx,
        }
    }

    pub fn handle(&self) -> MarketViewHandle {
        MarketViewHandle {
            book: self.book_tx.subscribe(),
            price: self.price_tx.subscribe(),
            candles: self.candles_tx.subscribe(),
        }
    }

    /// Seed from REST and stream until the feed ends or shutdown fires.
    #[instrument(skip_all)]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let initial = self
            .source
            .depth_snapshot(self.book_rows)
            .await
            .context("Initial depth snapshot failed")?;
        let symbol = initial.symbol.clone();
        self.book_tx
            .send_replace(Some(BookView::from_snapshot(initial)));

        let mut series = CandleSeries::new(self.candle_history);
        let history = self
            .source
            .candles(self.candle_history)
            .await
            .context("Candle history fetch failed")?;
        series.seed(history);
        self.candles_tx.send_replace(series.as_slice().to_vec());

        info!(%symbol, candles = series.len(), "Market view seeded");

        let mut book_stream = ThrottledStream::new(
            self.source.subscribe_depth(),
            self.book_interval,
            self.book_rows,
        );
        let mut trade_stream =
            ThrottledStream::new(self.source.subscribe_trades(), self.price_interval, 1);
        let mut candle_rx = self.source.subscribe_candles();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(%symbol, "Market view shutting down");
                        return Ok(());
                    }
                }

                snapshot = book_stream.next() => match snapshot {
                    Some(snapshot) => {
                        self.book_tx.send_replace(Some(BookView::from_snapshot(snapshot)));
                    }
                    None => {
                        info!(%symbol, "Depth feed ended");
                        return Ok(());
                    }
                },

                tick = trade_stream.next() => match tick {
                    Some(tick) => {
                        let display = PriceDisplay::next(
                            self.price_tx.borrow().as_ref(),
                            tick.price,
                            tick.timestamp_ms,
                        );
                        self.price_tx.send_replace(Some(display));
                    }
                    None => {
                        info!(%symbol, "Trade feed ended");
                        return Ok(());
                    }
                },

                candle = candle_rx.recv() => match candle {
                    Ok(candle) => {
                        match series.apply(candle) {
                            CandleUpdate::Stale => {
                                debug!(%symbol, bucket = candle.open_time, "Stale candle dropped");
                            }
                            _ => {
                                self.candles_tx.send_replace(series.as_slice().to_vec());
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(%symbol, dropped = n, "Candle subscriber lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!(%symbol, "Candle feed ended");
                        return Ok(());
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(price: f64) -> PriceDisplay {
        PriceDisplay {
            price,
            direction: PriceDirection::Flat,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_price_direction_tracks_previous_display() {
        let up = PriceDisplay::next(Some(&display(100.0)), 101.0, 1);
        assert_eq!(up.direction, PriceDirection::Up);

        let down = PriceDisplay::next(Some(&display(100.0)), 99.5, 2);
        assert_eq!(down.direction, PriceDirection::Down);

        let flat = PriceDisplay::next(Some(&display(100.0)), 100.0, 3);
        assert_eq!(flat.direction, PriceDirection::Flat);
    }

    #[test]
    fn test_first_price_is_flat() {
        let first = PriceDisplay::next(None, 42.0, 0);
        assert_eq!(first.direction, PriceDirection::Flat);
        assert_eq!(first.price, 42.0);
    }
}
