//! Chain client port - Fullnode dry-run interface.
//!
//! The only chain interaction the client performs itself is the
//! transaction dry run; signing and broadcasting go through the wallet
//! provider. Finality is never polled - broadcast acceptance is treated
//! as confirmation and the backend's event ingestion reconciles.

use async_trait::async_trait;

use crate::domain::payload::TxPayload;

/// Result of a dry-run execution against current chain state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub success: bool,
    /// Resource cost reported by the VM.
    pub gas_used: u64,
    /// VM status string; the rejection reason when `success` is false.
    pub vm_status: String,
}

/// Trait for fullnode interaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Dry-run an entry-function call as `sender` against current state.
    ///
    /// A transport failure is an error; an executed-but-rejected call is
    /// `Ok` with `success == false` so the caller can surface the VM
    /// status verbatim.
    async fn simulate(
        &self,
        sender: &str,
        payload: &TxPayload,
    ) -> anyhow::Result<SimulationOutcome>;

    /// Whether the fullnode answers its ledger-info endpoint.
    async fn is_healthy(&self) -> bool;
}
