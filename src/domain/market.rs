//! Market and price domain types.
//!
//! A `Market` is the decoded view of a backend market record: all
//! fixed-point string fields are already converted to `Decimal` so the
//! rest of the crate never touches raw scaled integers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Numeric market identifier assigned by the chain program.
pub type MarketId = u64;

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Chain-level boolean flag (`is_long`).
    pub fn is_long(self) -> bool {
        matches!(self, Self::Long)
    }

    pub fn from_is_long(is_long: bool) -> Self {
        if is_long {
            Self::Long
        } else {
            Self::Short
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Latest observed price attached to a market record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestPrice {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Oracle or feed that produced the observation.
    pub source: String,
}

/// A perpetual-futures market, refreshed periodically from the backend.
///
/// Immutable per fetch; a new fetch replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    /// Display symbol, e.g. "BTC/USDT".
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Maximum leverage permitted by the chain program.
    pub max_leverage: Decimal,
    /// Initial margin ratio.
    pub init_mr: Decimal,
    /// Maintenance margin ratio.
    pub maint_mr: Decimal,
    pub fee_rate: Decimal,
    pub liq_reward_rate: Decimal,
    pub settlement_token_id: u64,
    pub is_active: bool,
    pub latest_price: Option<LatestPrice>,
}

/// A single price observation from the backend price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub id: String,
    pub market_id: MarketId,
    pub symbol: String,
    pub price: Decimal,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_display_and_flag() {
        assert_eq!(Side::Long.to_string(), "LONG");
        assert_eq!(Side::Short.to_string(), "SHORT");
        assert!(Side::Long.is_long());
        assert_eq!(Side::from_is_long(false), Side::Short);
    }
}
