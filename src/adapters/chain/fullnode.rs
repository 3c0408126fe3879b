//! Fullnode REST Client - Transaction Dry Runs
//!
//! Connects to a Move fullnode over its REST API. Validates the chain
//! ID at startup and exposes the transaction simulation endpoint used
//! to dry-run every order payload before it reaches the wallet.
//!
//! Simulation submits an unsigned transaction with a zeroed signature;
//! the node executes it against current state without committing.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ChainConfig;
use crate::domain::payload::TxPayload;
use crate::ports::chain::{ChainClient, SimulationOutcome};

const SIMULATION_MAX_GAS: u64 = 200_000;
const SIMULATION_GAS_PRICE: u64 = 100;
const SIMULATION_EXPIRY_SECS: i64 = 60;

/// Zeroed ed25519 credentials accepted by the simulate endpoint.
const ZERO_PUBKEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";
const ZERO_SIGNATURE: &str = "0x00000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000";

/// HTTP client for a single fullnode.
pub struct FullnodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl FullnodeClient {
    /// Connect to the fullnode and validate the chain ID.
    #[instrument(skip_all)]
    pub async fn connect(config: &ChainConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build fullnode HTTP client")?;
        let client = Self {
            http,
            base_url: config.node_url.trim_end_matches('/').to_string(),
        };

        let info = client.ledger_info().await.context("Fullnode unreachable")?;
        anyhow::ensure!(
            info.chain_id == config.chain_id,
            "Expected chain_id={}, fullnode reports {}",
            config.chain_id,
            info.chain_id
        );
        info!(chain_id = info.chain_id, url = %client.base_url, "Connected to fullnode");
        Ok(client)
    }

    async fn ledger_info(&self) -> Result<LedgerInfo> {
        let url = format!("{}/v1", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .context("Ledger info request failed")?
            .error_for_status()
            .context("Ledger info returned error status")?
            .json()
            .await
            .context("Malformed ledger info response")
    }

    async fn sequence_number(&self, address: &str) -> Result<u64> {
        let url = format!("{}/v1/accounts/{}", self.base_url, address);
        let account: AccountInfo = self
            .http
            .get(&url)
            .send()
            .await
            .context("Account lookup failed")?
            .error_for_status()
            .with_context(|| format!("Account not found on chain: {address}"))?
            .json()
            .await
            .context("Malformed account response")?;
        account
            .sequence_number
            .parse()
            .context("Malformed sequence number")
    }
}

#[async_trait]
impl ChainClient for FullnodeClient {
    async fn simulate(&self, sender: &str, payload: &TxPayload) -> Result<SimulationOutcome> {
        let sequence_number = self.sequence_number(sender).await?;
        let expiry = chrono::Utc::now().timestamp() + SIMULATION_EXPIRY_SECS;

        let normalized = payload.normalized();
        let request = SimulateRequest {
            sender,
            sequence_number: sequence_number.to_string(),
            max_gas_amount: SIMULATION_MAX_GAS.to_string(),
            gas_unit_price: SIMULATION_GAS_PRICE.to_string(),
            expiration_timestamp_secs: expiry.to_string(),
            payload: EntryFunctionPayload {
                kind: "entry_function_payload",
                function: &normalized.function,
                type_arguments: &normalized.type_arguments,
                arguments: &normalized.arguments,
            },
            signature: SimulateSignature {
                kind: "ed25519_signature",
                public_key: ZERO_PUBKEY,
                signature: ZERO_SIGNATURE,
            },
        };

        let url = format!("{}/v1/transactions/simulate", self.base_url);
        let outcomes: Vec<SimulatedTx> = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Simulation request failed")?
            .error_for_status()
            .context("Simulation returned error status")?
            .json()
            .await
            .context("Malformed simulation response")?;

        let first = outcomes
            .into_iter()
            .next()
            .context("Simulation returned no execution result")?;
        debug!(
            function = %normalized.function,
            success = first.success,
            vm_status = %first.vm_status,
            "Dry run complete"
        );
        Ok(SimulationOutcome {
            success: first.success,
            gas_used: first.gas_used.parse().unwrap_or(0),
            vm_status: first.vm_status,
        })
    }

    async fn is_healthy(&self) -> bool {
        self.ledger_info().await.is_ok()
    }
}

// Wire types

#[derive(Debug, Deserialize)]
struct LedgerInfo {
    chain_id: u64,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    sequence_number: String,
}

#[derive(Debug, Serialize)]
struct SimulateRequest<'a> {
    sender: &'a str,
    sequence_number: String,
    max_gas_amount: String,
    gas_unit_price: String,
    expiration_timestamp_secs: String,
    payload: EntryFunctionPayload<'a>,
    signature: SimulateSignature<'a>,
}

#[derive(Debug, Serialize)]
struct EntryFunctionPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a str,
    type_arguments: &'a [String],
    arguments: &'a [crate::domain::payload::EntryArg],
}

#[derive(Debug, Serialize)]
struct SimulateSignature<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    public_key: &'a str,
    signature: &'a str,
}

#[derive(Debug, Deserialize)]
struct SimulatedTx {
    success: bool,
    gas_used: String,
    vm_status: String,
}
