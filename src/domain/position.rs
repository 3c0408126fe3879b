//! Position domain type and lifecycle status.
//!
//! Positions are owned by the backend: the client reads them, decodes the
//! fixed-point fields, and at most inserts an optimistic placeholder right
//! after a confirmed open. Status transitions are one-directional —
//! `OPEN` is the only non-terminal state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::{MarketId, Side};

/// Lifecycle status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
    Liquidated,
}

impl PositionStatus {
    /// Closed and liquidated positions never change again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(self, Self::Open) && next.is_terminal()
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Liquidated => write!(f, "LIQUIDATED"),
        }
    }
}

/// A perpetual position, decoded from the backend representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Backend record id.
    pub id: String,
    /// Chain the position lives on.
    pub chain_id: String,
    /// On-chain position id, present once the backend has observed the
    /// open event.
    pub chain_position_id: Option<String>,
    pub user_addr: String,
    pub market_id: MarketId,
    pub symbol: String,
    pub side: Side,
    pub margin: Decimal,
    pub leverage: Decimal,
    /// margin * leverage at open time.
    pub notional: Decimal,
    pub entry_price: Decimal,
    pub fees_paid: Decimal,
    pub funding_paid: Decimal,
    pub status: PositionStatus,
    pub health_factor: Option<Decimal>,
    pub pnl: Option<Decimal>,
    pub margin_ratio: Option<Decimal>,
    pub is_liquidatable: Option<bool>,
    pub current_price: Option<Decimal>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Optimistic placeholder inserted client-side after a confirmed open,
    /// before the backend's own event ingestion catches up.
    ///
    /// The backend record (keyed by the real transaction) supersedes this
    /// on the next refresh.
    pub fn optimistic(
        tx_hash: &str,
        user_addr: &str,
        market_id: MarketId,
        symbol: &str,
        side: Side,
        margin: Decimal,
        leverage: Decimal,
        entry_price: Decimal,
    ) -> Self {
        Self {
            id: format!("pending-{tx_hash}"),
            chain_id: String::new(),
            chain_position_id: None,
            user_addr: user_addr.to_string(),
            market_id,
            symbol: symbol.to_string(),
            side,
            margin,
            leverage,
            notional: margin * leverage,
            entry_price,
            fees_paid: Decimal::ZERO,
            funding_paid: Decimal::ZERO,
            status: PositionStatus::Open,
            health_factor: None,
            pnl: None,
            margin_ratio: None,
            is_liquidatable: None,
            current_price: None,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }
}
