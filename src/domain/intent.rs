//! Order intents - ephemeral user trade parameters.
//!
//! An intent exists only between form input and submission; it is
//! validated against the target market and then converted into a backend
//! order request. Nothing here survives a completed or cancelled submit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::market::{Market, MarketId, Side};

/// Validation failures for an order intent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntentError {
    #[error("margin must be positive, got {0}")]
    NonPositiveMargin(Decimal),
    #[error("leverage must be positive, got {0}")]
    NonPositiveLeverage(Decimal),
    #[error("leverage {requested} exceeds market maximum {max}")]
    LeverageTooHigh { requested: Decimal, max: Decimal },
    #[error("market {0} is not active")]
    MarketInactive(MarketId),
}

/// User-entered trade parameters for opening a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Client-side id for log correlation; never leaves the process.
    pub client_id: Uuid,
    pub market_id: MarketId,
    pub side: Side,
    pub margin: Decimal,
    pub leverage: Decimal,
    /// Optional price bound forwarded to the backend.
    pub acceptable_price: Option<Decimal>,
}

impl OrderIntent {
    pub fn new(market_id: MarketId, side: Side, margin: Decimal, leverage: Decimal) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            market_id,
            side,
            margin,
            leverage,
            acceptable_price: None,
        }
    }

    pub fn with_acceptable_price(mut self, price: Decimal) -> Self {
        self.acceptable_price = Some(price);
        self
    }

    /// Effective position size: margin * leverage.
    pub fn notional(&self) -> Decimal {
        self.margin * self.leverage
    }

    /// Input checks that need no market context. Used by the pipeline to
    /// fail fast before any network call.
    pub fn validate_amounts(&self) -> Result<(), IntentError> {
        if self.margin <= Decimal::ZERO {
            return Err(IntentError::NonPositiveMargin(self.margin));
        }
        if self.leverage <= Decimal::ZERO {
            return Err(IntentError::NonPositiveLeverage(self.leverage));
        }
        Ok(())
    }

    /// Full validation against the target market.
    pub fn validate(&self, market: &Market) -> Result<(), IntentError> {
        self.validate_amounts()?;
        if !market.is_active {
            return Err(IntentError::MarketInactive(market.id));
        }
        if self.leverage > market.max_leverage {
            return Err(IntentError::LeverageTooHigh {
                requested: self.leverage,
                max: market.max_leverage,
            });
        }
        Ok(())
    }
}
