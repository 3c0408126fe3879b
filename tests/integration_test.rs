//! Integration Tests - Submission Pipeline and Session
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;

use mockall::mock;
use mockall::predicate::*;
use rust_decimal_macros::dec;

use perps_desk::config::{
    ApiConfig, AppConfig, ChainConfig, ClientConfig, DisplayConfig, FeedConfig, MarketEntry,
    MetricsConfig, TradeConfig, WalletConfig,
};
use perps_desk::domain::intent::OrderIntent;
use perps_desk::domain::market::{Market, MarketId, PricePoint, Side};
use perps_desk::domain::payload::{EntryArg, TxPayload};
use perps_desk::domain::position::{Position, PositionStatus};
use perps_desk::ports::backend::{
    AgedPrice, CloseOrder, CloseOrderRequest, OpenOrder, OpenOrderParams, OpenOrderRequest,
    PositionPage, PositionQuery, PriceRefresh, PriceStaleness, SyncAck, SyncPositionRequest,
};
use perps_desk::ports::chain::SimulationOutcome;
use perps_desk::ports::wallet::{SubmittedTx, WalletError};
use perps_desk::usecases::{SubmissionPipeline, SubmitError, SyncOutcome, WalletSession};

// ---- Mock Definitions ----

mock! {
    pub Backend {}

    #[async_trait::async_trait]
    impl perps_desk::ports::backend::BackendApi for Backend {
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
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Chain {}

    #[async_trait::async_trait]
    impl perps_desk::ports::chain::ChainClient for Chain {
        async fn simulate(
            &self,
            sender: &str,
            payload: &TxPayload,
        ) -> anyhow::Result<SimulationOutcome>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Wallet {}

    #[async_trait::async_trait]
    impl perps_desk::ports::wallet::WalletProvider for Wallet {
        async fn connect(&self) -> Result<String, WalletError>;
        async fn disconnect(&self);
        fn is_connected(&self) -> bool;
        fn address(&self) -> Option<String>;
        async fn sign_and_submit(&self, payload: &TxPayload) -> Result<SubmittedTx, WalletError>;
    }
}

// ---- Fixtures ----

fn test_config() -> AppConfig {
    AppConfig {
        client: ClientConfig {
            name: "perps-desk-test".to_string(),
            log_level: "warn".to_string(),
        },
        api: ApiConfig {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 1000,
            max_retries: 0,
            retry_base_delay_ms: 1,
        },
        chain: ChainConfig {
            node_url: "http://localhost:8080".to_string(),
            module_address: "0xmod".to_string(),
            admin_address: "0xadmin".to_string(),
            chain_id: 2,
        },
        wallet: WalletConfig {
            url: "http://localhost:4100".to_string(),
            sign_timeout_ms: 1000,
        },
        feed: FeedConfig {
            rest_url: "http://localhost:9000".to_string(),
            ws_url: "ws://localhost:9001".to_string(),
            kline_interval: "1h".to_string(),
            depth_limit: 20,
        },
        display: DisplayConfig {
            book_rows: 12,
            book_interval_ms: 1000,
            price_interval_ms: 500,
            candle_history: 500,
        },
        trade: TradeConfig {
            sync_delay_ms: 0,
            max_price_age_secs: 60,
        },
        metrics: MetricsConfig {
            enabled: false,
            bind_address: "0.0.0.0:9090".to_string(),
        },
        markets: vec![MarketEntry {
            id: 1,
            symbol: "BTC/USDT".to_string(),
            feed_symbol: "BTCUSDT".to_string(),
            active: true,
        }],
    }
}

fn btc_market() -> Market {
    Market {
        id: 1,
        symbol: "BTC/USDT".to_string(),
        base_asset: "BTC".to_string(),
        quote_asset: "USDT".to_string(),
        max_leverage: dec!(20),
        init_mr: dec!(0.05),
        maint_mr: dec!(0.03),
        fee_rate: dec!(0.0006),
        liq_reward_rate: dec!(0.01),
        settlement_token_id: 1,
        is_active: true,
        latest_price: None,
    }
}

fn fresh_staleness() -> PriceStaleness {
    PriceStaleness {
        market_id: 1,
        is_stale: false,
        chain_price: Some(AgedPrice {
            price: dec!(67000),
            timestamp: chrono::Utc::now(),
            age_seconds: Some(3),
        }),
        db_price: None,
    }
}

fn open_order() -> OpenOrder {
    OpenOrder {
        message: "Order created".to_string(),
        payload: TxPayload::new(
            "0xmod::perps_core::open_position_entry",
            vec![
                EntryArg::Text("1".to_string()),
                EntryArg::Bool(true),
                EntryArg::Number(10_000_000_000),
                EntryArg::Text("500000000".to_string()),
                EntryArg::Text("0xadmin".to_string()),
            ],
        ),
        params: OpenOrderParams {
            market_id: 1,
            side: Side::Long,
            margin: dec!(10000000000),
            leverage: dec!(500000000),
            current_price: dec!(67000),
            acceptable_price: None,
        },
    }
}

fn connected_wallet() -> MockWallet {
    let mut wallet = MockWallet::new();
    wallet.expect_is_connected().return_const(true);
    wallet
        .expect_address()
        .returning(|| Some("0xuser".to_string()));
    wallet
}

// ---- Open-position pipeline ----

#[tokio::test]
async fn open_happy_path_confirms_and_syncs() {
    let mut backend = MockBackend::new();
    backend
        .expect_market()
        .with(eq(1u64))
        .returning(|_| Ok(btc_market()));
    backend
        .expect_price_staleness()
        .returning(|_| Ok(fresh_staleness()));
    backend
        .expect_create_open_order()
        .withf(|req: &OpenOrderRequest| {
            req.user_addr == "0xuser" && req.market_id == 1 && req.side == Side::Long
        })
        .returning(|_| Ok(open_order()));
    backend
        .expect_sync_position()
        .withf(|req: &SyncPositionRequest| req.tx_hash == "0xhash" && req.is_long)
        .times(1)
        .returning(|_| {
            Ok(SyncAck {
                position_id: "pos-1".to_string(),
                chain_id: "testnet".to_string(),
                is_new: true,
                message: "created".to_string(),
            })
        });

    let mut chain = MockChain::new();
    chain
        .expect_simulate()
        .withf(|sender: &str, payload: &TxPayload| {
            // The dry-run body must already be normalized: no raw numbers
            sender == "0xuser"
                && payload
                    .arguments
                    .iter()
                    .all(|a| !matches!(a, EntryArg::Number(_)))
        })
        .times(1)
        .returning(|_, _| {
            Ok(SimulationOutcome {
                success: true,
                gas_used: 812,
                vm_status: "Executed successfully".to_string(),
            })
        });

    let mut wallet = connected_wallet();
    wallet.expect_sign_and_submit().times(1).returning(|_| {
        Ok(SubmittedTx {
            hash: "0xhash".to_string(),
        })
    });

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(chain),
        Arc::new(wallet),
        &test_config(),
    );

    let intent = OrderIntent::new(1, Side::Long, dec!(100), dec!(5));
    let receipt = pipeline.open_position(&intent).await.unwrap();

    assert_eq!(receipt.tx_hash, "0xhash");
    assert_eq!(receipt.entry_price, dec!(67000));
    assert_eq!(receipt.optimistic.status, PositionStatus::Open);
    assert_eq!(receipt.optimistic.notional, dec!(500));
    assert!(matches!(receipt.sync, SyncOutcome::Synced(_)));
}

#[tokio::test]
async fn failed_dry_run_makes_zero_wallet_calls() {
    let mut backend = MockBackend::new();
    backend.expect_market().returning(|_| Ok(btc_market()));
    backend
        .expect_price_staleness()
        .returning(|_| Ok(fresh_staleness()));
    backend
        .expect_create_open_order()
        .returning(|_| Ok(open_order()));
    backend.expect_sync_position().times(0);

    let mut chain = MockChain::new();
    chain.expect_simulate().times(1).returning(|_, _| {
        Ok(SimulationOutcome {
            success: false,
            gas_used: 0,
            vm_status: "Move abort 0x7: price expired".to_string(),
        })
    });

    let mut wallet = connected_wallet();
    wallet.expect_sign_and_submit().times(0);

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(chain),
        Arc::new(wallet),
        &test_config(),
    );

    let intent = OrderIntent::new(1, Side::Long, dec!(100), dec!(5));
    let err = pipeline.open_position(&intent).await.unwrap_err();
    match err {
        SubmitError::Simulation(status) => assert!(status.contains("price expired")),
        other => panic!("expected simulation error, got {other}"),
    }
}

#[tokio::test]
async fn disconnected_wallet_fails_before_any_backend_call() {
    let mut backend = MockBackend::new();
    backend.expect_market().times(0);
    backend.expect_create_open_order().times(0);

    let mut wallet = MockWallet::new();
    wallet.expect_is_connected().return_const(false);
    wallet.expect_address().returning(|| None);

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(MockChain::new()),
        Arc::new(wallet),
        &test_config(),
    );

    let intent = OrderIntent::new(1, Side::Long, dec!(100), dec!(5));
    let err = pipeline.open_position(&intent).await.unwrap_err();
    assert!(matches!(err, SubmitError::WalletNotConnected));
    assert_eq!(err.to_string(), "connect wallet before trading");
}

#[tokio::test]
async fn invalid_leverage_rejected_before_order_construction() {
    let mut backend = MockBackend::new();
    backend.expect_market().returning(|_| Ok(btc_market()));
    backend.expect_create_open_order().times(0);

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(MockChain::new()),
        Arc::new(connected_wallet()),
        &test_config(),
    );

    let intent = OrderIntent::new(1, Side::Long, dec!(100), dec!(50));
    let err = pipeline.open_position(&intent).await.unwrap_err();
    assert!(matches!(err, SubmitError::InvalidInput(_)));
}

// ---- Price-freshness guard ----

#[tokio::test]
async fn stale_price_with_failed_refresh_expires_before_simulation() {
    let mut backend = MockBackend::new();
    backend.expect_market().returning(|_| Ok(btc_market()));
    backend.expect_price_staleness().returning(|_| {
        Ok(PriceStaleness {
            market_id: 1,
            is_stale: true,
            chain_price: None,
            db_price: Some(AgedPrice {
                price: dec!(66000),
                timestamp: chrono::Utc::now() - chrono::Duration::seconds(600),
                age_seconds: Some(600),
            }),
        })
    });
    backend
        .expect_refresh_price()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("oracle writer unavailable")));
    backend.expect_create_open_order().times(0);

    let mut chain = MockChain::new();
    chain.expect_simulate().times(0);

    let mut wallet = connected_wallet();
    wallet.expect_sign_and_submit().times(0);

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(chain),
        Arc::new(wallet),
        &test_config(),
    );

    let intent = OrderIntent::new(1, Side::Short, dec!(100), dec!(5));
    let err = pipeline.open_position(&intent).await.unwrap_err();
    assert!(matches!(err, SubmitError::PriceExpired(1)));
    assert_eq!(err.to_string(), "price expired for market 1");
}

#[tokio::test]
async fn stale_price_with_recent_db_observation_proceeds() {
    let mut backend = MockBackend::new();
    backend.expect_market().returning(|_| Ok(btc_market()));
    backend.expect_price_staleness().returning(|_| {
        Ok(PriceStaleness {
            market_id: 1,
            is_stale: true,
            chain_price: None,
            db_price: Some(AgedPrice {
                price: dec!(67000),
                timestamp: chrono::Utc::now(),
                age_seconds: Some(5),
            }),
        })
    });
    backend.expect_refresh_price().times(1).returning(|_| {
        Ok(PriceRefresh {
            market_id: 1,
            was_stale: true,
            is_now_stale: true,
            tx_hash: "0xrefresh".to_string(),
            success: false,
        })
    });
    backend
        .expect_create_open_order()
        .times(1)
        .returning(|_| Ok(open_order()));
    backend.expect_sync_position().returning(|_| {
        Ok(SyncAck {
            position_id: "pos-1".to_string(),
            chain_id: "testnet".to_string(),
            is_new: true,
            message: "created".to_string(),
        })
    });

    let mut chain = MockChain::new();
    chain.expect_simulate().returning(|_, _| {
        Ok(SimulationOutcome {
            success: true,
            gas_used: 812,
            vm_status: "Executed successfully".to_string(),
        })
    });

    let mut wallet = connected_wallet();
    wallet.expect_sign_and_submit().returning(|_| {
        Ok(SubmittedTx {
            hash: "0xhash".to_string(),
        })
    });

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(chain),
        Arc::new(wallet),
        &test_config(),
    );

    let intent = OrderIntent::new(1, Side::Long, dec!(100), dec!(5));
    assert!(pipeline.open_position(&intent).await.is_ok());
}

#[tokio::test]
async fn staleness_probe_transport_failure_is_not_fatal() {
    let mut backend = MockBackend::new();
    backend.expect_market().returning(|_| Ok(btc_market()));
    backend
        .expect_price_staleness()
        .returning(|_| Err(anyhow::anyhow!("connection refused")));
    backend
        .expect_create_open_order()
        .times(1)
        .returning(|_| Ok(open_order()));
    backend.expect_sync_position().returning(|_| {
        Ok(SyncAck {
            position_id: "pos-1".to_string(),
            chain_id: "testnet".to_string(),
            is_new: false,
            message: "exists".to_string(),
        })
    });

    let mut chain = MockChain::new();
    chain.expect_simulate().returning(|_, _| {
        Ok(SimulationOutcome {
            success: true,
            gas_used: 812,
            vm_status: "Executed successfully".to_string(),
        })
    });

    let mut wallet = connected_wallet();
    wallet.expect_sign_and_submit().returning(|_| {
        Ok(SubmittedTx {
            hash: "0xhash".to_string(),
        })
    });

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(chain),
        Arc::new(wallet),
        &test_config(),
    );

    let intent = OrderIntent::new(1, Side::Long, dec!(100), dec!(5));
    assert!(pipeline.open_position(&intent).await.is_ok());
}

// ---- Sync failure is advisory ----

#[tokio::test]
async fn failed_sync_still_returns_confirmed_receipt() {
    let mut backend = MockBackend::new();
    backend.expect_market().returning(|_| Ok(btc_market()));
    backend
        .expect_price_staleness()
        .returning(|_| Ok(fresh_staleness()));
    backend
        .expect_create_open_order()
        .returning(|_| Ok(open_order()));
    backend
        .expect_sync_position()
        .returning(|_| Err(anyhow::anyhow!("sync endpoint 500")));

    let mut chain = MockChain::new();
    chain.expect_simulate().returning(|_, _| {
        Ok(SimulationOutcome {
            success: true,
            gas_used: 812,
            vm_status: "Executed successfully".to_string(),
        })
    });

    let mut wallet = connected_wallet();
    wallet.expect_sign_and_submit().returning(|_| {
        Ok(SubmittedTx {
            hash: "0xhash".to_string(),
        })
    });

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(chain),
        Arc::new(wallet),
        &test_config(),
    );

    let intent = OrderIntent::new(1, Side::Long, dec!(100), dec!(5));
    let receipt = pipeline.open_position(&intent).await.unwrap();
    assert_eq!(receipt.tx_hash, "0xhash");
    assert!(matches!(receipt.sync, SyncOutcome::Failed(_)));
}

// ---- Close pipeline ----

#[tokio::test]
async fn close_with_floor_forwards_minimum_exit_price() {
    let mut backend = MockBackend::new();
    backend
        .expect_create_close_order()
        .withf(|req: &CloseOrderRequest| {
            req.position_id == "pos-1" && req.min_exit_price == Some(dec!(66500))
        })
        .times(1)
        .returning(|_| {
            Ok(CloseOrder {
                message: "Close order created".to_string(),
                payload: TxPayload::new(
                    "0xmod::perps_core::close_position_entry",
                    vec![EntryArg::Text("7".to_string())],
                ),
                position_id: "pos-1".to_string(),
                chain_position_id: "7".to_string(),
                market_id: 1,
                current_price: dec!(67000),
                estimated_pnl: dec!(12.5),
                estimated_payout: dec!(112.5),
            })
        });

    let mut chain = MockChain::new();
    chain.expect_simulate().returning(|_, _| {
        Ok(SimulationOutcome {
            success: true,
            gas_used: 420,
            vm_status: "Executed successfully".to_string(),
        })
    });

    let mut wallet = connected_wallet();
    wallet.expect_sign_and_submit().returning(|_| {
        Ok(SubmittedTx {
            hash: "0xclose".to_string(),
        })
    });

    let pipeline = SubmissionPipeline::new(
        Arc::new(backend),
        Arc::new(chain),
        Arc::new(wallet),
        &test_config(),
    );

    let receipt = pipeline
        .close_position_with_floor("pos-1", dec!(66500))
        .await
        .unwrap();
    assert_eq!(receipt.tx_hash, "0xclose");
    assert_eq!(receipt.estimated_pnl, dec!(12.5));
    assert_eq!(receipt.market_id, 1);
}

// ---- Wallet session ----

#[tokio::test]
async fn session_connect_then_disconnect_round_trip() {
    let mut wallet = MockWallet::new();
    wallet
        .expect_connect()
        .times(1)
        .returning(|| Ok("0xuser".to_string()));
    wallet.expect_disconnect().times(1).returning(|| ());

    let session = WalletSession::new(Arc::new(wallet));
    let rx = session.subscribe();

    let address = session.connect().await.unwrap();
    assert_eq!(address, "0xuser");
    assert_eq!(rx.borrow().address(), Some("0xuser"));

    session.disconnect().await;
    assert_eq!(rx.borrow().address(), None);
}
