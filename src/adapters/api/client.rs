//! Backend HTTP Client - Enveloped REST Client with Retries
//!
//! Wraps reqwest for all backend API interactions: transient failures
//! (transport errors, 5xx, 429) retry with exponential backoff, while a
//! declared API error in the `{ data, error }` envelope fails
//! immediately with the extracted message.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::types::Envelope;
use crate::config::ApiConfig;

/// Configuration for the backend HTTP client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Backend base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries on transient errors.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub retry_base_delay: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

impl ApiClientConfig {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

/// Enveloped REST client for the backend order-construction API.
pub struct ApiClient {
    http: Client,
    config: ApiClientConfig,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, config })
    }

    /// GET a path and unwrap the `{ data, error }` envelope.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute_with_retry("GET", path, None).await?;
        Self::unwrap_envelope(response, path).await
    }

    /// POST a JSON body (or nothing) and unwrap the envelope.
    pub async fn post_data<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let body_json = body
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize request body")?;
        let response = self
            .execute_with_retry("POST", path, body_json.as_deref())
            .await?;
        Self::unwrap_envelope(response, path).await
    }

    /// Whether the backend answers `GET /health`.
    pub async fn health_check(&self) -> bool {
        self.execute_with_retry("GET", "/health", None)
            .await
            .is_ok()
    }

    /// Execute a request, retrying transport errors and 5xx/429.
    async fn execute_with_retry(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis(), path, "Retrying request");
                sleep(delay).await;
            }

            let request = match method {
                "POST" => {
                    let mut req = self
                        .http
                        .post(&url)
                        .header("Content-Type", "application/json");
                    if let Some(b) = body {
                        req = req.body(b.to_string());
                    }
                    req
                }
                _ => self.http.get(&url),
            };

            match request.send().await {
                Ok(response) => match response.status() {
                    status if status.is_success() => return Ok(response),
                    StatusCode::TOO_MANY_REQUESTS => {
                        warn!(path, "Rate limited by backend, backing off");
                        last_error = Some(anyhow::anyhow!("Rate limited"));
                        continue;
                    }
                    status if status.is_server_error() => {
                        warn!(status = %status, path, "Server error, retrying");
                        last_error = Some(anyhow::anyhow!("Server error: {status}"));
                        continue;
                    }
                    // 4xx responses still carry an envelope with the
                    // declared error; surface it without retrying.
                    _ => return Ok(response),
                },
                Err(e) => {
                    warn!(error = %e, attempt, path, "Request failed");
                    last_error = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
    }

    /// Parse the envelope, failing with the declared error message when
    /// `error` is non-null or `data` is missing.
    async fn unwrap_envelope<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body for {path}"))?;

        let envelope: Envelope<T> = serde_json::from_str(&body).with_context(|| {
            format!("Malformed response for {path} (status {status})")
        })?;

        if let Some(error) = envelope.error {
            anyhow::bail!("{}", error.message());
        }
        envelope
            .data
            .ok_or_else(|| anyhow::anyhow!("Backend returned no data for {path}"))
    }
}
