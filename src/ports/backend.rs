//! Backend API port - Order-construction and position service.
//!
//! The backend owns markets, price history, and positions, and builds
//! ready-to-sign transaction payloads for open/close orders. The client
//! never constructs those payloads itself; it forwards them to the chain
//! after a successful dry run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::{Market, MarketId, PricePoint, Side};
use crate::domain::payload::TxPayload;
use crate::domain::position::{Position, PositionStatus};

/// Query parameters for the positions listing.
#[derive(Debug, Clone, Default)]
pub struct PositionQuery {
    pub user: Option<String>,
    pub market_id: Option<MarketId>,
    pub status: Option<PositionStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PositionQuery {
    pub fn open_for(user: &str) -> Self {
        Self {
            user: Some(user.to_string()),
            status: Some(PositionStatus::Open),
            ..Self::default()
        }
    }
}

/// One page of positions plus the backend's pagination echo.
#[derive(Debug, Clone)]
pub struct PositionPage {
    pub positions: Vec<Position>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// A price observation with its age, as reported by the staleness check.
#[derive(Debug, Clone, PartialEq)]
pub struct AgedPrice {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub age_seconds: Option<i64>,
}

/// Result of `GET /prices/staleness/:marketId`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceStaleness {
    pub market_id: MarketId,
    pub is_stale: bool,
    /// Last price the chain program has seen.
    pub chain_price: Option<AgedPrice>,
    /// Last price the backend database has seen.
    pub db_price: Option<AgedPrice>,
}

/// Result of `POST /prices/refresh/:marketId`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRefresh {
    pub market_id: MarketId,
    pub was_stale: bool,
    pub is_now_stale: bool,
    pub tx_hash: String,
    pub success: bool,
}

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct OpenOrderRequest {
    pub user_addr: String,
    pub market_id: MarketId,
    pub side: Side,
    pub margin: Decimal,
    pub leverage: Decimal,
    pub acceptable_price: Option<Decimal>,
}

/// Backend echo of the open-order parameters it encoded.
#[derive(Debug, Clone)]
pub struct OpenOrderParams {
    pub market_id: MarketId,
    pub side: Side,
    /// Fixed-point margin as forwarded on-chain.
    pub margin: Decimal,
    /// Fixed-point leverage as forwarded on-chain.
    pub leverage: Decimal,
    /// Price used to construct the order; becomes the optimistic entry
    /// price on sync.
    pub current_price: Decimal,
    pub acceptable_price: Option<Decimal>,
}

/// A ready-to-sign open order from the backend.
#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub message: String,
    pub payload: TxPayload,
    pub params: OpenOrderParams,
}

/// Request body for `POST /orders/close`.
#[derive(Debug, Clone, Serialize)]
pub struct CloseOrderRequest {
    pub position_id: String,
    pub user_addr: String,
    /// Slippage floor: minimum acceptable exit price.
    pub min_exit_price: Option<Decimal>,
}

/// A ready-to-sign close order from the backend.
#[derive(Debug, Clone)]
pub struct CloseOrder {
    pub message: String,
    pub payload: TxPayload,
    pub position_id: String,
    pub chain_position_id: String,
    pub market_id: MarketId,
    pub current_price: Decimal,
    pub estimated_pnl: Decimal,
    pub estimated_payout: Decimal,
}

/// Request body for the optimistic `POST /positions/sync`.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPositionRequest {
    pub tx_hash: String,
    pub user_addr: String,
    pub market_id: MarketId,
    pub is_long: bool,
    pub margin: Decimal,
    pub leverage: Decimal,
    pub entry_price: Decimal,
}

/// Backend acknowledgement of an optimistic sync.
#[derive(Debug, Clone)]
pub struct SyncAck {
    pub position_id: String,
    pub chain_id: String,
    pub is_new: bool,
    pub message: String,
}

/// Trait for the backend order-construction API.
///
/// Implementors translate these calls into the REST surface; all errors
/// are already flattened to human-readable messages. The `{data, error}`
/// envelope never leaks past the adapter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendApi: Send + Sync + 'static {
    async fn markets(&self) -> anyhow::Result<Vec<Market>>;

    async fn market(&self, id: MarketId) -> anyhow::Result<Market>;

    async fn prices(
        &self,
        market_id: Option<MarketId>,
        limit: usize,
    ) -> anyhow::Result<Vec<PricePoint>>;

    async fn price_staleness(&self, market_id: MarketId) -> anyhow::Result<PriceStaleness>;

    async fn refresh_price(&self, market_id: MarketId) -> anyhow::Result<PriceRefresh>;

    async fn positions(&self, query: &PositionQuery) -> anyhow::Result<PositionPage>;

    async fn position(&self, id: &str) -> anyhow::Result<Position>;

    async fn create_open_order(&self, req: &OpenOrderRequest) -> anyhow::Result<OpenOrder>;

    async fn create_close_order(&self, req: &CloseOrderRequest) -> anyhow::Result<CloseOrder>;

    async fn sync_position(&self, req: &SyncPositionRequest) -> anyhow::Result<SyncAck>;

    /// Whether the backend answers its health endpoint.
    async fn is_healthy(&self) -> bool;
}
