//! Wallet provider port - External signing interface.
//!
//! Wallet internals (key custody, user approval UI) are out of scope;
//! this trait is the narrow surface the pipeline needs: connection
//! lifecycle, the account address, and sign-and-broadcast. Once a
//! signature request is issued it runs to completion or user rejection -
//! there is no mid-flight cancellation.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::payload::TxPayload;

/// A broadcast-accepted transaction handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: String,
}

/// Wallet-side failures, split so the pipeline can map them onto its
/// error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("user rejected the signature request")]
    Rejected,
    #[error("wallet unavailable: {0}")]
    Provider(String),
    #[error("broadcast failed: {0}")]
    Broadcast(String),
}

/// Trait for the external wallet-signing provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Establish a session and return the account address.
    async fn connect(&self) -> Result<String, WalletError>;

    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Account address of the active session, if any.
    fn address(&self) -> Option<String>;

    /// Request a signature for `payload` and broadcast the signed
    /// transaction. Blocks until the wallet approves, rejects, or the
    /// broadcast fails.
    async fn sign_and_submit(&self, payload: &TxPayload) -> Result<SubmittedTx, WalletError>;
}
