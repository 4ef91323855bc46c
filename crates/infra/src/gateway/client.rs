//! Gateway API client for the query/authenticate/confirm protocol.
//!
//! Implements the three-endpoint gateway contract:
//! - `GET messages/pending` - authenticated, returns the JSON message queue
//! - `POST messages/token` - exchanges the static API key for a bearer token
//!   (plain-text request and response bodies)
//! - `POST messages/sent` - authenticated, confirms one delivery by id
//!
//! Authenticated requests that come back 401 trigger a token refresh and
//! exactly one retried request with the then-current token; a second 401 is
//! surfaced as a protocol error. The bearer token lives in memory for the
//! lifetime of the client and is replaced wholesale on refresh.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use smsrelay_core::MessageGateway;
use smsrelay_domain::{GatewayConfig, PendingMessage, RelayError, Result};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::http::HttpClient;

/// Configuration for the gateway client
#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    /// Base URL of the gateway API (e.g., "https://gateway.example.com/api")
    pub base_url: String,
    /// Static API key exchanged for bearer tokens
    pub api_key: String,
    /// Timeout for gateway requests
    pub timeout: Duration,
    /// Total HTTP attempts for transient failures (initial try + retries)
    pub max_attempts: usize,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gateway.example.com/api".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

impl From<&GatewayConfig> for GatewayClientConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.request_timeout(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Gateway protocol client holding the in-memory bearer token
pub struct GatewayClient {
    http: HttpClient,
    config: GatewayClientConfig,
    token: RwLock<String>,
}

impl GatewayClient {
    /// Create a new gateway client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_config(config: GatewayClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(config.max_attempts)
            .build()?;

        Ok(Self { http, config, token: RwLock::new(String::new()) })
    }

    /// Fetch the queue of pending messages, in server order.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Network` on transport failure and
    /// `RelayError::Protocol` for any non-2xx response that survives the
    /// bounded 401 refresh-and-retry.
    #[instrument(skip(self))]
    pub async fn fetch_pending(&self) -> Result<Vec<PendingMessage>> {
        let url = self.endpoint("messages/pending");

        debug!(url = %url, "Requesting pending messages");

        let response = self
            .send_authorized(|http, token| {
                http.request(Method::GET, &url).header(AUTHORIZATION, bearer(token))
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Protocol { status: status.as_u16(), body });
        }

        let messages: Vec<PendingMessage> = response.json().await.map_err(|err| {
            RelayError::Protocol {
                status: status.as_u16(),
                body: format!("unparseable message queue: {err}"),
            }
        })?;

        info!(count = messages.len(), "Received pending messages from gateway");
        Ok(messages)
    }

    /// Confirm that the message with the given id was delivered locally.
    ///
    /// # Errors
    ///
    /// Same contract as [`fetch_pending`](Self::fetch_pending).
    #[instrument(skip(self), fields(id = %id))]
    pub async fn confirm_sent(&self, id: &str) -> Result<()> {
        let url = self.endpoint("messages/sent");
        let id = id.to_string();

        debug!(url = %url, "Confirming delivery");

        let response = self
            .send_authorized(|http, token| {
                http.request(Method::POST, &url)
                    .header(AUTHORIZATION, bearer(token))
                    .header("Content-Type", "text/plain")
                    .body(id.clone())
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Protocol { status: status.as_u16(), body });
        }

        info!(id = %id, "Delivery confirmed to gateway");
        Ok(())
    }

    /// Exchange the static API key for a fresh bearer token.
    ///
    /// A rejected exchange (non-2xx) is logged and leaves the previous token
    /// in place, so the caller's retried request fails with the more
    /// informative terminal error instead.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Network` if the exchange request cannot be
    /// completed at all.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<()> {
        let url = self.endpoint("messages/token");

        debug!(url = %url, "Requesting fresh bearer token");

        let request = self
            .http
            .request(Method::POST, &url)
            .header("Content-Type", "text/plain")
            .body(self.config.api_key.clone());

        let response = self.http.send(request).await?;
        let status = response.status();

        if status.is_success() {
            let token = response
                .text()
                .await
                .map_err(|err| RelayError::Network(format!("token body unreadable: {err}")))?;
            *self.token.write().await = token;
            info!("Bearer token refreshed");
        } else {
            warn!(status = %status, "Token exchange rejected; keeping previous token");
        }

        Ok(())
    }

    /// Send an authenticated request, refreshing the token and retrying the
    /// request exactly once when the gateway answers 401.
    async fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&HttpClient, &str) -> RequestBuilder,
    {
        let response = self.send_with_current_token(&build).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Unauthorized response; refreshing token for one retry");
        self.refresh_token().await?;

        // Bounded by construction: a second 401 is returned to the caller
        self.send_with_current_token(&build).await
    }

    async fn send_with_current_token<F>(&self, build: &F) -> Result<Response>
    where
        F: Fn(&HttpClient, &str) -> RequestBuilder,
    {
        let token = self.token.read().await.clone();
        self.http.send(build(&self.http, &token)).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl MessageGateway for GatewayClient {
    async fn fetch_pending(&self) -> Result<Vec<PendingMessage>> {
        Self::fetch_pending(self).await
    }

    async fn confirm_sent(&self, id: &str) -> Result<()> {
        Self::confirm_sent(self, id).await
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
