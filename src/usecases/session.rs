//! Wallet Session - Connection Lifecycle
//!
//! Thin state machine over the wallet provider. Observers subscribe to a
//! watch channel instead of polling the provider, so the display layer
//! reacts to connect/disconnect without touching the adapter.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::ports::wallet::{WalletError, WalletProvider};

/// Observable connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected { address: String },
}

impl SessionState {
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Connected { address } => Some(address),
            _ => None,
        }
    }
}

/// Wallet session shared across the desk.
pub struct WalletSession<W> {
    wallet: Arc<W>,
    state_tx: watch::Sender<SessionState>,
}

impl<W: WalletProvider> WalletSession<W> {
    pub fn new(wallet: Arc<W>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self { wallet, state_tx }
    }

    /// Connect through the provider and publish the resulting state.
    ///
    /// A failed connect lands back in `Disconnected`; there is no retry
    /// loop here, the user triggers another attempt.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<String, WalletError> {
        self.state_tx.send_replace(SessionState::Connecting);
        match self.wallet.connect().await {
            Ok(address) => {
                info!(%address, "Wallet session established");
                self.state_tx.send_replace(SessionState::Connected {
                    address: address.clone(),
                });
                Ok(address)
            }
            Err(e) => {
                warn!(error = %e, "Wallet connect failed");
                self.state_tx.send_replace(SessionState::Disconnected);
                Err(e)
            }
        }
    }

    pub async fn disconnect(&self) {
        self.wallet.disconnect().await;
        self.state_tx.send_replace(SessionState::Disconnected);
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_connected()
    }

    pub fn address(&self) -> Option<String> {
        self.wallet.address()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }
}
