//! Order book snapshots and the derived display view.
//!
//! The vendor feed replaces the whole book on every message; there is no
//! incremental patching. Cumulative totals are computed when the snapshot
//! is built, spread statistics only when a snapshot is published.

use serde::{Deserialize, Serialize};

/// One price level with its cumulative depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub quantity: f64,
    /// Running quantity total from the top of this side of the book.
    pub total: f64,
}

/// A wholesale order book snapshot, truncated to the display row count.
///
/// Bids are sorted by price descending, asks ascending, both starting at
/// the touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub symbol: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub timestamp_ms: u64,
}

impl DepthSnapshot {
    /// Build a snapshot from raw `(price, quantity)` string pairs as the
    /// vendor delivers them. Unparseable levels are skipped.
    pub fn from_raw(
        symbol: &str,
        raw_bids: &[(String, String)],
        raw_asks: &[(String, String)],
        rows: usize,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: accumulate(raw_bids, rows),
            asks: accumulate(raw_asks, rows),
            timestamp_ms,
        }
    }

    /// Records available for the completeness check: a snapshot is only
    /// "full" once both sides carry the configured row count.
    pub fn record_count(&self) -> usize {
        self.bids.len().min(self.asks.len())
    }

    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }
}

fn accumulate(raw: &[(String, String)], rows: usize) -> Vec<BookLevel> {
    let mut total = 0.0;
    raw.iter()
        .take(rows)
        .filter_map(|(p, q)| {
            let price: f64 = p.parse().ok()?;
            let quantity: f64 = q.parse().ok()?;
            total += quantity;
            Some(BookLevel {
                price,
                quantity,
                total,
            })
        })
        .collect()
}

/// Published book state with spread statistics, derived from a snapshot
/// at publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookView {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub spread: f64,
    pub spread_pct: f64,
    pub timestamp_ms: u64,
}

impl BookView {
    pub fn from_snapshot(snapshot: DepthSnapshot) -> Self {
        let (spread, spread_pct) = match (snapshot.best_bid(), snapshot.best_ask()) {
            (Some(bid), Some(ask)) if ask > 0.0 => {
                let value = ask - bid;
                (value, value / ask * 100.0)
            }
            _ => (0.0, 0.0),
        };
        Self {
            bids: snapshot.bids,
            asks: snapshot.asks,
            spread,
            spread_pct,
            timestamp_ms: snapshot.timestamp_ms,
        }
    }

    /// Largest cumulative total across both sides, used for depth bars.
    pub fn max_total(&self) -> f64 {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .map(|l| l.total)
            .fold(0.0, f64::max)
    }
}
