//! Remote Wallet Adapter - External Signer Daemon
//!
//! Talks to a local signer daemon over HTTP. The daemon owns the keys
//! and prompts the user; this adapter only carries the connection
//! lifecycle and the sign-and-broadcast round trip.
//!
//! Session state lives here, not in the daemon: `connect` caches the
//! account address and `disconnect` drops it. The pipeline consults
//! `is_connected` before any trading action.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::WalletConfig;
use crate::domain::payload::TxPayload;
use crate::ports::wallet::{SubmittedTx, WalletError, WalletProvider};

/// Wallet provider backed by a remote signer daemon.
pub struct RemoteWallet {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<String>>,
}

impl RemoteWallet {
    pub fn new(config: &WalletConfig) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.sign_timeout_ms))
            .build()
            .map_err(|e| WalletError::Provider(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        })
    }
}

#[async_trait]
impl WalletProvider for RemoteWallet {
    async fn connect(&self) -> Result<String, WalletError> {
        let url = format!("{}/account", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::Provider(format!("signer unreachable: {e}")))?;
        if !response.status().is_success() {
            return Err(WalletError::Provider(format!(
                "signer returned {}",
                response.status()
            )));
        }
        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Provider(format!("malformed account response: {e}")))?;

        *self.session.write().expect("session lock poisoned") = Some(account.address.clone());
        info!(address = %account.address, "Wallet connected");
        Ok(account.address)
    }

    async fn disconnect(&self) {
        let previous = self.session.write().expect("session lock poisoned").take();
        if let Some(address) = previous {
            info!(%address, "Wallet disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.session.read().expect("session lock poisoned").is_some()
    }

    fn address(&self) -> Option<String> {
        self.session.read().expect("session lock poisoned").clone()
    }

    async fn sign_and_submit(&self, payload: &TxPayload) -> Result<SubmittedTx, WalletError> {
        if !self.is_connected() {
            return Err(WalletError::Provider("no active session".to_string()));
        }

        let url = format!("{}/sign_and_submit", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&payload.normalized())
            .send()
            .await
            .map_err(|e| WalletError::Provider(format!("signer unreachable: {e}")))?;

        let status = response.status();
        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Provider(format!("malformed signer response: {e}")))?;

        match body {
            SignResponse::Accepted { hash } => Ok(SubmittedTx { hash }),
            SignResponse::Error { code, message: _ } if code == "USER_REJECTED" => {
                warn!("Signature request rejected by user");
                Err(WalletError::Rejected)
            }
            SignResponse::Error { code, message } if status.is_success() || code == "BROADCAST" => {
                Err(WalletError::Broadcast(message))
            }
            SignResponse::Error { message, .. } => Err(WalletError::Provider(message)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignResponse {
    Accepted { hash: String },
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_response_accepted() {
        let raw = r#"{"hash":"0xdeadbeef"}"#;
        match serde_json::from_str::<SignResponse>(raw).unwrap() {
            SignResponse::Accepted { hash } => assert_eq!(hash, "0xdeadbeef"),
            SignResponse::Error { .. } => panic!("expected accepted"),
        }
    }

    #[test]
    fn test_sign_response_rejection() {
        let raw = r#"{"code":"USER_REJECTED","message":"declined in prompt"}"#;
        match serde_json::from_str::<SignResponse>(raw).unwrap() {
            SignResponse::Error { code, .. } => assert_eq!(code, "USER_REJECTED"),
            SignResponse::Accepted { .. } => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle_without_daemon() {
        let wallet = RemoteWallet::new(&WalletConfig {
            url: "http://127.0.0.1:1".to_string(),
            sign_timeout_ms: 100,
        })
        .unwrap();
        assert!(!wallet.is_connected());
        assert!(wallet.address().is_none());
        // Unreachable daemon surfaces as a provider error, session stays down
        assert!(matches!(
            wallet.connect().await,
            Err(WalletError::Provider(_))
        ));
        assert!(!wallet.is_connected());
    }

    #[tokio::test]
    async fn test_sign_requires_session() {
        let wallet = RemoteWallet::new(&WalletConfig {
            url: "http://127.0.0.1:1".to_string(),
            sign_timeout_ms: 100,
        })
        .unwrap();
        let payload = TxPayload::new("0x1::m::f", vec![]);
        assert!(matches!(
            wallet.sign_and_submit(&payload).await,
            Err(WalletError::Provider(_))
        ));
    }
}
