//! Configuration loader
//!
//! Loads agent configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files (TOML)
//!
//! ## Environment Variables
//! - `SMSRELAY_GATEWAY_URL`: Base URL of the gateway API
//! - `SMSRELAY_API_KEY`: Static API key for the token exchange
//! - `SMSRELAY_CHANNEL_URL`: HTTP send endpoint of the local SMS bridge
//! - `SMSRELAY_STATS_PATH`: Path of the SQLite stats database
//! - `SMSRELAY_HTTP_TIMEOUT_SECS`: Request timeout (optional)
//! - `SMSRELAY_HTTP_MAX_ATTEMPTS`: Transient-failure attempts (optional)
//! - `SMSRELAY_MESSAGE_PAUSE_MS`: Pause between messages (optional)
//! - `SMSRELAY_POLL_INTERVAL_SECS`: Interval between cycles (optional)
//!
//! ## File Locations
//! The loader probes `smsrelay.toml` and `config.toml` in the current and
//! parent directory, in that order.

use std::path::{Path, PathBuf};

use smsrelay_domain::constants::{
    DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_MESSAGE_PAUSE_MS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, MAX_MESSAGE_LEN,
};
use smsrelay_domain::{
    ChannelConfig, Config, DeliveryConfig, GatewayConfig, RelayError, Result, SchedulerConfig,
    StorageConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `RelayError::Config` if configuration cannot be loaded from
/// either source
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// All required environment variables must be present; optional ones fall
/// back to their defaults.
///
/// # Errors
/// Returns `RelayError::Config` naming the missing or invalid variable
pub fn load_from_env() -> Result<Config> {
    let base_url = env_var("SMSRELAY_GATEWAY_URL")?;
    let api_key = env_var("SMSRELAY_API_KEY")?;
    let send_url = env_var("SMSRELAY_CHANNEL_URL")?;
    let stats_path = env_var("SMSRELAY_STATS_PATH")?;

    let request_timeout_secs =
        env_u64_or("SMSRELAY_HTTP_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
    let max_attempts = env_u64_or("SMSRELAY_HTTP_MAX_ATTEMPTS", DEFAULT_HTTP_MAX_ATTEMPTS as u64)?;
    let message_pause_ms = env_u64_or("SMSRELAY_MESSAGE_PAUSE_MS", DEFAULT_MESSAGE_PAUSE_MS)?;
    let poll_interval_secs =
        env_u64_or("SMSRELAY_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;

    Ok(Config {
        gateway: GatewayConfig {
            base_url,
            api_key,
            request_timeout_secs,
            max_attempts: max_attempts as usize,
        },
        delivery: DeliveryConfig { message_pause_ms, max_body_len: MAX_MESSAGE_LEN },
        channel: ChannelConfig { send_url, request_timeout_secs },
        storage: StorageConfig { stats_path },
        scheduler: SchedulerConfig { poll_interval_secs },
    })
}

/// Load configuration from a TOML file
///
/// If `path` is `None`, probes the locations listed in the module
/// documentation.
///
/// # Errors
/// Returns `RelayError::Config` if no file is found or the file does not
/// parse
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_paths()
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| RelayError::Config("no config file found".into()))?,
    };

    let raw = std::fs::read_to_string(&path).map_err(|err| {
        RelayError::Config(format!("cannot read {}: {err}", path.display()))
    })?;

    let config: Config = toml::from_str(&raw).map_err(|err| {
        RelayError::Config(format!("invalid config {}: {err}", path.display()))
    })?;

    tracing::info!(path = %path.display(), "Configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("smsrelay.toml"),
        PathBuf::from("config.toml"),
        PathBuf::from("../smsrelay.toml"),
        PathBuf::from("../config.toml"),
    ]
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| RelayError::Config(format!("missing environment variable {name}")))
}

fn env_u64_or(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|err| RelayError::Config(format!("invalid {name}: {err}"))),
        Err(_) => Ok(default),
    }
}
