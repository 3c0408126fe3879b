//! Backend API Wire Types
//!
//! Serde representations of the backend's JSON surface. The backend
//! wraps every response as `{ data, error }` and serializes all
//! fixed-point fields as strings; conversion into domain types happens
//! here so nothing downstream sees raw scaled values.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::fixed::parse_fixed;
use crate::domain::market::{LatestPrice, Market, MarketId, PricePoint, Side};
use crate::domain::payload::{EntryArg, TxPayload};
use crate::domain::position::{Position, PositionStatus};
use crate::ports::backend::{
    AgedPrice, CloseOrder, CloseOrderRequest, OpenOrder, OpenOrderParams, OpenOrderRequest,
    PositionPage, PriceRefresh, PriceStaleness, SyncAck, SyncPositionRequest,
};

/// The `{ data, error }` envelope around every backend response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// Backend error: either a bare string or `{ code, message }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorBody {
    Text(String),
    Coded {
        code: String,
        #[serde(default)]
        message: Option<String>,
    },
}

impl ApiErrorBody {
    /// Human-readable message, mirroring the original extraction rules:
    /// prefer the message, fall back to the code.
    pub fn message(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Coded { code, message } => message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| code.clone()),
        }
    }
}

// ── Market / price DTOs ─────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPriceDto {
    pub price: String,
    pub timestamp: String,
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDto {
    pub id: MarketId,
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub max_leverage: String,
    pub init_mr: String,
    pub maint_mr: String,
    pub fee_rate: String,
    pub liq_reward_rate: String,
    pub settlement_token_id: u64,
    pub is_active: bool,
    #[serde(default)]
    pub latest_price: Option<LatestPriceDto>,
}

impl MarketDto {
    pub fn into_domain(self) -> Result<Market> {
        let latest_price = self
            .latest_price
            .map(|p| -> Result<LatestPrice> {
                Ok(LatestPrice {
                    price: parse_fixed(&p.price)?,
                    timestamp: parse_timestamp(&p.timestamp)?,
                    source: p.source,
                })
            })
            .transpose()?;
        Ok(Market {
            id: self.id,
            symbol: self.symbol,
            base_asset: self.base_asset,
            quote_asset: self.quote_asset,
            max_leverage: parse_fixed(&self.max_leverage)?,
            init_mr: parse_fixed(&self.init_mr)?,
            maint_mr: parse_fixed(&self.maint_mr)?,
            fee_rate: parse_fixed(&self.fee_rate)?,
            liq_reward_rate: parse_fixed(&self.liq_reward_rate)?,
            settlement_token_id: self.settlement_token_id,
            is_active: self.is_active,
            latest_price,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDto {
    pub id: String,
    pub market_id: MarketId,
    pub symbol: String,
    pub price: String,
    pub source: String,
    pub timestamp: String,
}

impl PriceDto {
    pub fn into_domain(self) -> Result<PricePoint> {
        Ok(PricePoint {
            id: self.id,
            market_id: self.market_id,
            symbol: self.symbol,
            price: parse_fixed(&self.price)?,
            source: self.source,
            timestamp: parse_timestamp(&self.timestamp)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgedPriceDto {
    pub price: String,
    pub timestamp: String,
    #[serde(default)]
    pub age_seconds: Option<i64>,
}

impl AgedPriceDto {
    fn into_domain(self) -> Result<AgedPrice> {
        Ok(AgedPrice {
            price: parse_fixed(&self.price)?,
            timestamp: parse_timestamp(&self.timestamp)?,
            age_seconds: self.age_seconds,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StalenessDto {
    pub market_id: MarketId,
    pub is_stale: bool,
    #[serde(default)]
    pub chain_price: Option<AgedPriceDto>,
    #[serde(default)]
    pub db_price: Option<AgedPriceDto>,
}

impl StalenessDto {
    pub fn into_domain(self) -> Result<PriceStaleness> {
        Ok(PriceStaleness {
            market_id: self.market_id,
            is_stale: self.is_stale,
            chain_price: self.chain_price.map(AgedPriceDto::into_domain).transpose()?,
            db_price: self.db_price.map(AgedPriceDto::into_domain).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshDto {
    pub market_id: MarketId,
    pub was_stale: bool,
    pub is_now_stale: bool,
    pub tx_hash: String,
    pub success: bool,
}

impl RefreshDto {
    pub fn into_domain(self) -> PriceRefresh {
        PriceRefresh {
            market_id: self.market_id,
            was_stale: self.was_stale,
            is_now_stale: self.is_now_stale,
            tx_hash: self.tx_hash,
            success: self.success,
        }
    }
}

// ── Position DTOs ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub id: String,
    pub chain_id: String,
    #[serde(default)]
    pub chain_position_id: Option<String>,
    pub user_addr: String,
    pub market_id: MarketId,
    pub symbol: String,
    pub is_long: bool,
    pub margin: String,
    pub leverage: String,
    pub notional: String,
    pub entry_price: String,
    pub fees_paid: String,
    pub funding_paid: String,
    pub status: PositionStatus,
    #[serde(default)]
    pub health_factor: Option<String>,
    #[serde(default)]
    pub pnl: Option<String>,
    #[serde(default)]
    pub margin_ratio: Option<String>,
    #[serde(default)]
    pub is_liquidatable: Option<bool>,
    #[serde(default)]
    pub current_price: Option<String>,
    pub opened_at: String,
    #[serde(default)]
    pub closed_at: Option<String>,
}

impl PositionDto {
    pub fn into_domain(self) -> Result<Position> {
        Ok(Position {
            id: self.id,
            chain_id: self.chain_id,
            chain_position_id: self.chain_position_id,
            user_addr: self.user_addr,
            market_id: self.market_id,
            symbol: self.symbol,
            side: Side::from_is_long(self.is_long),
            margin: parse_fixed(&self.margin)?,
            leverage: parse_fixed(&self.leverage)?,
            notional: parse_fixed(&self.notional)?,
            entry_price: parse_fixed(&self.entry_price)?,
            fees_paid: parse_fixed(&self.fees_paid)?,
            funding_paid: parse_fixed(&self.funding_paid)?,
            status: self.status,
            // Health factor and margin ratio are plain decimals, not
            // fixed-point scaled.
            health_factor: parse_plain_opt(self.health_factor.as_deref())?,
            pnl: self.pnl.as_deref().map(parse_fixed).transpose()?,
            margin_ratio: parse_plain_opt(self.margin_ratio.as_deref())?,
            is_liquidatable: self.is_liquidatable,
            current_price: self.current_price.as_deref().map(parse_fixed).transpose()?,
            opened_at: parse_timestamp(&self.opened_at)?,
            closed_at: self
                .closed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationDto {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionsPageDto {
    pub positions: Vec<PositionDto>,
    pub pagination: PaginationDto,
}

impl PositionsPageDto {
    pub fn into_domain(self) -> Result<PositionPage> {
        Ok(PositionPage {
            positions: self
                .positions
                .into_iter()
                .map(PositionDto::into_domain)
                .collect::<Result<Vec<_>>>()?,
            total: self.pagination.total,
            limit: self.pagination.limit,
            offset: self.pagination.offset,
        })
    }
}

// ── Order DTOs ──────────────────────────────────────────────

/// Transaction payload as the backend spells it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPayloadDto {
    pub function: String,
    pub function_arguments: Vec<EntryArg>,
}

impl TxPayloadDto {
    pub fn into_domain(self) -> TxPayload {
        TxPayload::new(self.function, self.function_arguments)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderParamsDto {
    pub market_id: MarketId,
    pub side: String,
    pub margin: String,
    pub leverage: String,
    pub current_price: String,
    #[serde(default)]
    pub acceptable_price: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderDto {
    pub message: String,
    pub tx_payload: TxPayloadDto,
    pub params: OpenOrderParamsDto,
}

impl OpenOrderDto {
    pub fn into_domain(self) -> Result<OpenOrder> {
        let side = match self.params.side.as_str() {
            "LONG" => Side::Long,
            "SHORT" => Side::Short,
            other => anyhow::bail!("unknown order side {other:?}"),
        };
        Ok(OpenOrder {
            message: self.message,
            payload: self.tx_payload.into_domain(),
            params: OpenOrderParams {
                market_id: self.params.market_id,
                side,
                margin: parse_fixed(&self.params.margin)?,
                leverage: parse_fixed(&self.params.leverage)?,
                current_price: parse_fixed(&self.params.current_price)?,
                acceptable_price: self
                    .params
                    .acceptable_price
                    .as_deref()
                    .map(parse_fixed)
                    .transpose()?,
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOrderParamsDto {
    pub position_id: String,
    pub chain_id: String,
    pub chain_position_id: String,
    pub market_id: MarketId,
    pub current_price: String,
    pub estimated_pnl: String,
    pub estimated_payout: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOrderDto {
    pub message: String,
    pub tx_payload: TxPayloadDto,
    pub params: CloseOrderParamsDto,
}

impl CloseOrderDto {
    pub fn into_domain(self) -> Result<CloseOrder> {
        Ok(CloseOrder {
            message: self.message,
            payload: self.tx_payload.into_domain(),
            position_id: self.params.position_id,
            chain_position_id: self.params.chain_position_id,
            market_id: self.params.market_id,
            current_price: parse_fixed(&self.params.current_price)?,
            estimated_pnl: parse_fixed(&self.params.estimated_pnl)?,
            estimated_payout: parse_fixed(&self.params.estimated_payout)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAckDto {
    pub id: String,
    pub chain_id: String,
    pub message: String,
    pub is_new: bool,
}

impl SyncAckDto {
    pub fn into_domain(self) -> SyncAck {
        SyncAck {
            position_id: self.id,
            chain_id: self.chain_id,
            is_new: self.is_new,
            message: self.message,
        }
    }
}

// ── Request bodies ──────────────────────────────────────────

/// `POST /orders` body. Amounts travel as plain decimals; the backend
/// performs the fixed-point scaling when it builds the payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderRequestDto {
    pub user_addr: String,
    pub market_id: MarketId,
    pub side: String,
    pub margin: f64,
    pub leverage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptable_price: Option<f64>,
}

impl OpenOrderRequestDto {
    pub fn from_port(req: &OpenOrderRequest) -> Self {
        Self {
            user_addr: req.user_addr.clone(),
            market_id: req.market_id,
            side: req.side.to_string(),
            margin: decimal_to_f64(req.margin),
            leverage: decimal_to_f64(req.leverage),
            acceptable_price: req.acceptable_price.map(decimal_to_f64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOrderRequestDto {
    pub position_id: String,
    pub user_addr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_exit_price: Option<f64>,
}

impl CloseOrderRequestDto {
    pub fn from_port(req: &CloseOrderRequest) -> Self {
        Self {
            position_id: req.position_id.clone(),
            user_addr: req.user_addr.clone(),
            min_exit_price: req.min_exit_price.map(decimal_to_f64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPositionRequestDto {
    pub tx_hash: String,
    pub user_addr: String,
    pub market_id: MarketId,
    pub is_long: bool,
    pub margin: f64,
    pub leverage: f64,
    pub entry_price: f64,
}

impl SyncPositionRequestDto {
    pub fn from_port(req: &SyncPositionRequest) -> Self {
        Self {
            tx_hash: req.tx_hash.clone(),
            user_addr: req.user_addr.clone(),
            market_id: req.market_id,
            is_long: req.is_long,
            margin: decimal_to_f64(req.margin),
            leverage: decimal_to_f64(req.leverage),
            entry_price: decimal_to_f64(req.entry_price),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("invalid timestamp {raw:?}"))
}

fn parse_plain_opt(raw: Option<&str>) -> Result<Option<Decimal>> {
    raw.map(|s| {
        s.parse::<Decimal>()
            .with_context(|| format!("invalid decimal {s:?}"))
    })
    .transpose()
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
