//! REST Backend - BackendApi Port Implementation
//!
//! Maps the port's typed operations onto the backend REST surface via
//! the shared `ApiClient` (inherits retry and envelope handling).

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::client::ApiClient;
use super::types::{
    CloseOrderDto, CloseOrderRequestDto, MarketDto, OpenOrderDto, OpenOrderRequestDto,
    PositionDto, PositionsPageDto, PriceDto, RefreshDto, StalenessDto, SyncAckDto,
    SyncPositionRequestDto,
};
use crate::domain::market::{Market, MarketId, PricePoint};
use crate::domain::position::Position;
use crate::ports::backend::{
    BackendApi, CloseOrder, CloseOrderRequest, OpenOrder, OpenOrderRequest, PositionPage,
    PositionQuery, PriceRefresh, PriceStaleness, SyncAck, SyncPositionRequest,
};

/// Backend API adapter over the shared enveloped HTTP client.
pub struct RestBackend {
    client: Arc<ApiClient>,
}

impl RestBackend {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendApi for RestBackend {
    async fn markets(&self) -> Result<Vec<Market>> {
        let dtos: Vec<MarketDto> = self
            .client
            .get_data("/markets")
            .await
            .context("Failed to fetch markets")?;
        dtos.into_iter().map(MarketDto::into_domain).collect()
    }

    async fn market(&self, id: MarketId) -> Result<Market> {
        let dto: MarketDto = self
            .client
            .get_data(&format!("/markets/{id}"))
            .await
            .with_context(|| format!("Failed to fetch market {id}"))?;
        dto.into_domain()
    }

    async fn prices(
        &self,
        market_id: Option<MarketId>,
        limit: usize,
    ) -> Result<Vec<PricePoint>> {
        let path = match market_id {
            Some(id) => format!("/prices?marketId={id}&limit={limit}"),
            None => format!("/prices?limit={limit}"),
        };
        let dtos: Vec<PriceDto> = self
            .client
            .get_data(&path)
            .await
            .context("Failed to fetch prices")?;
        dtos.into_iter().map(PriceDto::into_domain).collect()
    }

    async fn price_staleness(&self, market_id: MarketId) -> Result<PriceStaleness> {
        let dto: StalenessDto = self
            .client
            .get_data(&format!("/prices/staleness/{market_id}"))
            .await
            .with_context(|| format!("Failed to check price staleness for market {market_id}"))?;
        dto.into_domain()
    }

    async fn refresh_price(&self, market_id: MarketId) -> Result<PriceRefresh> {
        let dto: RefreshDto = self
            .client
            .post_data::<(), _>(&format!("/prices/refresh/{market_id}"), None)
            .await
            .with_context(|| format!("Failed to refresh price for market {market_id}"))?;
        Ok(dto.into_domain())
    }

    async fn positions(&self, query: &PositionQuery) -> Result<PositionPage> {
        let mut params = Vec::new();
        if let Some(user) = &query.user {
            params.push(format!("user={user}"));
        }
        if let Some(id) = query.market_id {
            params.push(format!("marketId={id}"));
        }
        if let Some(status) = query.status {
            params.push(format!("status={status}"));
        }
        if let Some(limit) = query.limit {
            params.push(format!("limit={limit}"));
        }
        if let Some(offset) = query.offset {
            params.push(format!("offset={offset}"));
        }
        let path = if params.is_empty() {
            "/positions".to_string()
        } else {
            format!("/positions?{}", params.join("&"))
        };

        let dto: PositionsPageDto = self
            .client
            .get_data(&path)
            .await
            .context("Failed to fetch positions")?;
        dto.into_domain()
    }

    async fn position(&self, id: &str) -> Result<Position> {
        let dto: PositionDto = self
            .client
            .get_data(&format!("/positions/{id}"))
            .await
            .with_context(|| format!("Failed to fetch position {id}"))?;
        dto.into_domain()
    }

    async fn create_open_order(&self, req: &OpenOrderRequest) -> Result<OpenOrder> {
        let body = OpenOrderRequestDto::from_port(req);
        let dto: OpenOrderDto = self
            .client
            .post_data("/orders", Some(&body))
            .await
            .context("Failed to create open order")?;
        dto.into_domain()
    }

    async fn create_close_order(&self, req: &CloseOrderRequest) -> Result<CloseOrder> {
        let body = CloseOrderRequestDto::from_port(req);
        let dto: CloseOrderDto = self
            .client
            .post_data("/orders/close", Some(&body))
            .await
            .context("Failed to create close order")?;
        dto.into_domain()
    }

    async fn sync_position(&self, req: &SyncPositionRequest) -> Result<SyncAck> {
        let body = SyncPositionRequestDto::from_port(req);
        let dto: SyncAckDto = self
            .client
            .post_data("/positions/sync", Some(&body))
            .await
            .context("Failed to sync position")?;
        Ok(dto.into_domain())
    }

    async fn is_healthy(&self) -> bool {
        self.client.health_check().await
    }
}
