//! Configuration structures
//!
//! Typed configuration for the relay agent. The infra crate provides the
//! loader (environment variables first, config file fallback); these
//! structures only define shape and defaults.

use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_MESSAGE_PAUSE_MS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, MAX_MESSAGE_LEN,
};

/// Gateway server connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway API (e.g., "https://gateway.example.com/api")
    pub base_url: String,
    /// Static API key exchanged for bearer tokens
    pub api_key: String,
    /// Timeout for gateway requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Total HTTP attempts for transient failures (initial try + retries)
    #[serde(default = "default_http_max_attempts")]
    pub max_attempts: usize,
}

impl GatewayConfig {
    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Dispatch loop settings
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Pause between messages, in milliseconds (fixed-rate throttle)
    #[serde(default = "default_message_pause_ms")]
    pub message_pause_ms: u64,
    /// Maximum accepted message body length, in characters
    #[serde(default = "default_max_body_len")]
    pub max_body_len: usize,
}

impl DeliveryConfig {
    /// Inter-message pause as a `Duration`
    pub fn message_pause(&self) -> Duration {
        Duration::from_millis(self.message_pause_ms)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            message_pause_ms: DEFAULT_MESSAGE_PAUSE_MS,
            max_body_len: MAX_MESSAGE_LEN,
        }
    }
}

/// Local SMS channel settings
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// URL of the HTTP-fronted SMS modem bridge
    pub send_url: String,
    /// Timeout for channel requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ChannelConfig {
    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Persistent stats storage settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite stats database
    pub stats_path: String,
}

/// Scheduler settings
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between delivery cycles, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl SchedulerConfig {
    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS }
    }
}

/// Aggregate agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    pub channel: ChannelConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_http_max_attempts() -> usize {
    DEFAULT_HTTP_MAX_ATTEMPTS
}

fn default_message_pause_ms() -> u64 {
    DEFAULT_MESSAGE_PAUSE_MS
}

fn default_max_body_len() -> usize {
    MAX_MESSAGE_LEN
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
