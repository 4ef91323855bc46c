//! HTTP-fronted SMS modem bridge adapter.
//!
//! Default implementation of the `SmsChannel` port for deployments where a
//! local modem or SMS gateway daemon (kannel-style) exposes an HTTP send
//! endpoint. Every failure - transport or HTTP status - is reported as a
//! channel error; the delivery service isolates it to the current message.
//!
//! The 160-character body policy is enforced upstream by the delivery
//! service, not here.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use smsrelay_core::SmsChannel;
use smsrelay_domain::{ChannelConfig, RelayError, Result};
use tracing::debug;

use crate::http::HttpClient;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    text: &'a str,
}

/// SMS channel adapter posting to an HTTP modem bridge
pub struct HttpSmsChannel {
    http: HttpClient,
    send_url: String,
}

impl HttpSmsChannel {
    /// Create a new channel adapter from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_config(config: &ChannelConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .user_agent("smsrelay/channel")
            .build()?;

        Ok(Self { http, send_url: config.send_url.clone() })
    }
}

#[async_trait]
impl SmsChannel for HttpSmsChannel {
    async fn send(&self, destination: &str, body: &str) -> Result<()> {
        let request = self
            .http
            .request(Method::POST, &self.send_url)
            .json(&SendRequest { to: destination, text: body });

        let response = self
            .http
            .send(request)
            .await
            .map_err(|err| RelayError::Channel(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(RelayError::Channel(format!(
                "modem bridge returned {status}: {reason}"
            )));
        }

        debug!(destination = %destination, "Channel accepted message");
        Ok(())
    }
}
