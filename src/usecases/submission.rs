//! Submission Pipeline - Order Lifecycle Management
//!
//! Drives every transaction the desk sends: open, close, and the
//! collateral calls. The stages are fixed and strictly ordered:
//!
//! 1. Session and input checks (no network)
//! 2. Market fetch and intent validation
//! 3. Price-freshness guard
//! 4. Payload construction (backend for orders, local for collateral)
//! 5. Dry run against the fullnode
//! 6. Signature and broadcast through the wallet
//! 7. Optimistic position sync (open only, advisory)
//!
//! The wallet is never reached after a failed dry run. Broadcast
//! acceptance is terminal; finality is reconciled by the backend.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::domain::fixed::FixedPointError;
use crate::domain::intent::{IntentError, OrderIntent};
use crate::domain::market::{Market, MarketId};
use crate::domain::payload::{self, TxPayload};
use crate::domain::position::Position;
use crate::ports::backend::{
    BackendApi, CloseOrderRequest, OpenOrderRequest, SyncAck, SyncPositionRequest,
};
use crate::ports::chain::ChainClient;
use crate::ports::wallet::{WalletError, WalletProvider};

/// Where a submission currently stands. Published on a watch channel so
/// the display layer can render progress without polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    BuildingPayload,
    Simulating,
    AwaitingSignature,
    Submitted { tx_hash: String },
    Confirmed { tx_hash: String },
    Failed { reason: String },
}

/// Submission failures, one variant per pipeline stage that can reject.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("connect wallet before trading")]
    WalletNotConnected,
    #[error("invalid order: {0}")]
    InvalidInput(String),
    #[error("price expired for market {0}")]
    PriceExpired(MarketId),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("transaction would fail: {0}")]
    Simulation(String),
    #[error("signature request rejected")]
    SignatureRejected,
    #[error("broadcast failed: {0}")]
    Broadcast(String),
}

impl From<IntentError> for SubmitError {
    fn from(e: IntentError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl From<FixedPointError> for SubmitError {
    fn from(e: FixedPointError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl From<WalletError> for SubmitError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::Rejected => Self::SignatureRejected,
            WalletError::Provider(m) | WalletError::Broadcast(m) => Self::Broadcast(m),
        }
    }
}

/// Outcome of the advisory post-broadcast position sync.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Synced(SyncAck),
    /// Sync failed; the backend's event ingestion will catch up on its
    /// own and the broadcast itself already succeeded.
    Failed(String),
}

/// Result of a confirmed open submission.
#[derive(Debug, Clone)]
pub struct OpenReceipt {
    pub tx_hash: String,
    /// Price the order was built at; the optimistic entry price.
    pub entry_price: Decimal,
    /// Placeholder row for the position board.
    pub optimistic: Position,
    pub sync: SyncOutcome,
}

/// Result of a confirmed close submission.
#[derive(Debug, Clone)]
pub struct CloseReceipt {
    pub tx_hash: String,
    pub position_id: String,
    pub market_id: MarketId,
    pub estimated_pnl: Decimal,
    pub estimated_payout: Decimal,
}

/// The transaction submission pipeline.
pub struct SubmissionPipeline<B, C, W> {
    backend: Arc<B>,
    chain: Arc<C>,
    wallet: Arc<W>,
    module_addr: String,
    max_price_age: Duration,
    sync_delay: Duration,
    state_tx: watch::Sender<SubmissionState>,
}

impl<B, C, W> SubmissionPipeline<B, C, W>
where
    B: BackendApi,
    C: ChainClient,
    W: WalletProvider,
{
    pub fn new(backend: Arc<B>, chain: Arc<C>, wallet: Arc<W>, config: &AppConfig) -> Self {
        let (state_tx, _) = watch::channel(SubmissionState::Idle);
        Self {
            backend,
            chain,
            wallet,
            module_addr: config.chain.module_address.clone(),
            max_price_age: Duration::from_secs(config.trade.max_price_age_secs.max(0) as u64),
            sync_delay: Duration::from_millis(config.trade.sync_delay_ms),
            state_tx,
        }
    }

    /// Watch the pipeline state. `Failed` persists until the next
    /// submission begins.
    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state_tx.subscribe()
    }

    /// Open a new position from a validated intent.
    #[instrument(skip(self), fields(market_id = intent.market_id, side = %intent.side))]
    pub async fn open_position(&self, intent: &OrderIntent) -> Result<OpenReceipt, SubmitError> {
        let result = self.open_inner(intent).await;
        self.finish(&result);
        result
    }

    async fn open_inner(&self, intent: &OrderIntent) -> Result<OpenReceipt, SubmitError> {
        let sender = self.require_wallet()?;
        intent.validate_amounts()?;
        self.state_tx.send_replace(SubmissionState::BuildingPayload);

        let market = self
            .backend
            .market(intent.market_id)
            .await
            .map_err(|e| SubmitError::Backend(e.to_string()))?;
        intent.validate(&market)?;

        self.ensure_fresh_price(&market).await?;

        let order = self
            .backend
            .create_open_order(&OpenOrderRequest {
                user_addr: sender.clone(),
                market_id: intent.market_id,
                side: intent.side,
                margin: intent.margin,
                leverage: intent.leverage,
                acceptable_price: intent.acceptable_price,
            })
            .await
            .map_err(|e| SubmitError::Backend(e.to_string()))?;
        self.check_module(&order.payload)?;

        let tx_hash = self.simulate_and_submit(&sender, &order.payload).await?;

        let entry_price = order.params.current_price;
        let optimistic = Position::optimistic(
            &tx_hash,
            &sender,
            intent.market_id,
            &market.symbol,
            intent.side,
            intent.margin,
            intent.leverage,
            entry_price,
        );

        let sync = self
            .sync_after_delay(&tx_hash, &sender, intent, entry_price)
            .await;

        Ok(OpenReceipt {
            tx_hash,
            entry_price,
            optimistic,
            sync,
        })
    }

    /// Close a position at market.
    pub async fn close_position(&self, position_id: &str) -> Result<CloseReceipt, SubmitError> {
        self.close_with_floor(position_id, None).await
    }

    /// Close a position with a minimum acceptable exit price.
    pub async fn close_position_with_floor(
        &self,
        position_id: &str,
        min_exit_price: Decimal,
    ) -> Result<CloseReceipt, SubmitError> {
        self.close_with_floor(position_id, Some(min_exit_price))
            .await
    }

    #[instrument(skip(self))]
    async fn close_with_floor(
        &self,
        position_id: &str,
        min_exit_price: Option<Decimal>,
    ) -> Result<CloseReceipt, SubmitError> {
        let result = self.close_inner(position_id, min_exit_price).await;
        self.finish(&result);
        result
    }

    async fn close_inner(
        &self,
        position_id: &str,
        min_exit_price: Option<Decimal>,
    ) -> Result<CloseReceipt, SubmitError> {
        let sender = self.require_wallet()?;
        self.state_tx.send_replace(SubmissionState::BuildingPayload);

        let order = self
            .backend
            .create_close_order(&CloseOrderRequest {
                position_id: position_id.to_string(),
                user_addr: sender.clone(),
                min_exit_price,
            })
            .await
            .map_err(|e| SubmitError::Backend(e.to_string()))?;
        self.check_module(&order.payload)?;

        let tx_hash = self.simulate_and_submit(&sender, &order.payload).await?;

        Ok(CloseReceipt {
            tx_hash,
            position_id: order.position_id,
            market_id: order.market_id,
            estimated_pnl: order.estimated_pnl,
            estimated_payout: order.estimated_payout,
        })
    }

    /// Deposit settlement collateral into the program vault. The payload
    /// is built locally; no backend round trip.
    pub async fn deposit_collateral(&self, amount: Decimal) -> Result<String, SubmitError> {
        let result = self.collateral_inner(amount, false).await;
        self.finish(&result);
        result
    }

    /// Mint test collateral to the connected account (testnet only).
    pub async fn mint_test_collateral(&self, amount: Decimal) -> Result<String, SubmitError> {
        let result = self.collateral_inner(amount, true).await;
        self.finish(&result);
        result
    }

    async fn collateral_inner(&self, amount: Decimal, mint: bool) -> Result<String, SubmitError> {
        let sender = self.require_wallet()?;
        if amount <= Decimal::ZERO {
            return Err(SubmitError::InvalidInput(format!(
                "amount must be positive, got {amount}"
            )));
        }
        self.state_tx.send_replace(SubmissionState::BuildingPayload);

        let payload = if mint {
            payload::mint_test_collateral(&self.module_addr, &sender, amount)?
        } else {
            payload::deposit_collateral(&self.module_addr, amount)?
        };

        self.simulate_and_submit(&sender, &payload).await
    }

    /// A backend-built payload must target the configured program module.
    fn check_module(&self, payload: &TxPayload) -> Result<(), SubmitError> {
        if payload.function.starts_with(&self.module_addr) {
            Ok(())
        } else {
            Err(SubmitError::Backend(format!(
                "payload targets foreign module: {}",
                payload.function
            )))
        }
    }

    fn require_wallet(&self) -> Result<String, SubmitError> {
        self.wallet
            .address()
            .filter(|_| self.wallet.is_connected())
            .ok_or(SubmitError::WalletNotConnected)
    }

    /// Dry run, then sign and broadcast. The simulated body and the
    /// signed body are the same normalized payload.
    async fn simulate_and_submit(
        &self,
        sender: &str,
        raw_payload: &TxPayload,
    ) -> Result<String, SubmitError> {
        let payload = raw_payload.normalized();

        self.state_tx.send_replace(SubmissionState::Simulating);
        let outcome = self
            .chain
            .simulate(sender, &payload)
            .await
            .map_err(|e| SubmitError::Simulation(e.to_string()))?;
        if !outcome.success {
            return Err(SubmitError::Simulation(outcome.vm_status));
        }
        info!(gas_used = outcome.gas_used, "Dry run succeeded");

        self.state_tx.send_replace(SubmissionState::AwaitingSignature);
        let submitted = self.wallet.sign_and_submit(&payload).await?;

        self.state_tx.send_replace(SubmissionState::Submitted {
            tx_hash: submitted.hash.clone(),
        });
        info!(tx_hash = %submitted.hash, function = %payload.function, "Transaction broadcast");
        Ok(submitted.hash)
    }

    /// Price-freshness guard ahead of order construction.
    ///
    /// A failing staleness probe is not fatal: the chain program enforces
    /// its own bound and the dry run will reject a truly expired price.
    async fn ensure_fresh_price(&self, market: &Market) -> Result<(), SubmitError> {
        let staleness = match self.backend.price_staleness(market.id).await {
            Ok(s) => s,
            Err(e) => {
                warn!(market_id = market.id, error = %e, "Staleness probe failed, proceeding");
                return Ok(());
            }
        };
        if !staleness.is_stale {
            return Ok(());
        }

        info!(market_id = market.id, "On-chain price stale, requesting refresh");
        match self.backend.refresh_price(market.id).await {
            Ok(refresh) if refresh.success && !refresh.is_now_stale => {
                info!(market_id = market.id, tx_hash = %refresh.tx_hash, "Price refreshed");
                return Ok(());
            }
            Ok(refresh) => {
                warn!(market_id = market.id, tx_hash = %refresh.tx_hash, "Refresh did not clear staleness");
            }
            Err(e) => {
                warn!(market_id = market.id, error = %e, "Price refresh failed");
            }
        }

        // Refresh failed. A recent database observation is still an
        // acceptable basis for the order; the chain check remains the
        // final arbiter.
        let recent_db = staleness
            .db_price
            .as_ref()
            .and_then(|p| p.age_seconds)
            .is_some_and(|age| age >= 0 && (age as u64) <= self.max_price_age.as_secs());
        if recent_db {
            warn!(market_id = market.id, "Proceeding on recent database price");
            Ok(())
        } else {
            Err(SubmitError::PriceExpired(market.id))
        }
    }

    async fn sync_after_delay(
        &self,
        tx_hash: &str,
        sender: &str,
        intent: &OrderIntent,
        entry_price: Decimal,
    ) -> SyncOutcome {
        tokio::time::sleep(self.sync_delay).await;
        let request = SyncPositionRequest {
            tx_hash: tx_hash.to_string(),
            user_addr: sender.to_string(),
            market_id: intent.market_id,
            is_long: intent.side.is_long(),
            margin: intent.margin,
            leverage: intent.leverage,
            entry_price,
        };
        match self.backend.sync_position(&request).await {
            Ok(ack) => {
                info!(position_id = %ack.position_id, is_new = ack.is_new, "Position synced");
                SyncOutcome::Synced(ack)
            }
            Err(e) => {
                warn!(tx_hash = %tx_hash, error = %e, "Optimistic sync failed");
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    fn finish<T>(&self, result: &Result<T, SubmitError>) {
        match result {
            Ok(_) => {
                // Submitted already advanced to a tx-bearing state; mark
                // it confirmed.
                let current = self.state_tx.borrow().clone();
                if let SubmissionState::Submitted { tx_hash } = current {
                    self.state_tx
                        .send_replace(SubmissionState::Confirmed { tx_hash });
                }
            }
            Err(e) => {
                self.state_tx.send_replace(SubmissionState::Failed {
                    reason: e.to_string(),
                });
            }
        }
    }
}
