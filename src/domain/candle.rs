//! Candlestick buckets and the rolling series.
//!
//! The in-progress bucket is updated in place on every feed tick; a
//! bucket becomes immutable the moment a later bucket arrives.

use serde::{Deserialize, Serialize};

/// One OHLCV bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time in Unix seconds.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Whether the vendor marked this bucket as final.
    pub closed: bool,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// Absolute and percentage change over the bucket.
    pub fn change(&self) -> (f64, f64) {
        let delta = self.close - self.open;
        let pct = if self.open != 0.0 {
            delta / self.open * 100.0
        } else {
            0.0
        };
        (delta, pct)
    }
}

/// How a series absorbed an incoming bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleUpdate {
    /// New bucket appended; the previous one is now closed.
    Appended,
    /// In-progress bucket replaced in place.
    Updated,
    /// Bucket older than the current head; closed buckets are immutable.
    Stale,
}

/// Bounded rolling candle series for one symbol/interval.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    max_len: usize,
}

impl CandleSeries {
    pub fn new(max_len: usize) -> Self {
        Self {
            candles: Vec::with_capacity(max_len),
            max_len,
        }
    }

    /// Replace the series with a historical snapshot, oldest first.
    pub fn seed(&mut self, mut history: Vec<Candle>) {
        history.sort_by_key(|c| c.open_time);
        if history.len() > self.max_len {
            history.drain(..history.len() - self.max_len);
        }
        self.candles = history;
    }

    /// Absorb one streamed bucket.
    pub fn apply(&mut self, candle: Candle) -> CandleUpdate {
        match self.candles.last_mut() {
            Some(last) if candle.open_time == last.open_time => {
                *last = candle;
                CandleUpdate::Updated
            }
            Some(last) if candle.open_time < last.open_time => CandleUpdate::Stale,
            _ => {
                self.candles.push(candle);
                if self.candles.len() > self.max_len {
                    self.candles.remove(0);
                }
                CandleUpdate::Appended
            }
        }
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }
}
