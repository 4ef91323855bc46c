//! Error types used throughout the relay pipeline
//!
//! Provides error classification with retry metadata: the scheduler uses
//! `should_retry` to decide whether the next tick can reasonably succeed.

use std::time::Duration;

use thiserror::Error;

/// Categories of relay errors for retry decisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Authentication errors that survived the bounded refresh-and-retry
    Authentication,
    /// Server-side errors (5xx) - retryable on a later run
    Server,
    /// Client errors (4xx except auth) - non-retryable
    Client,
    /// Network/connection errors - retryable
    Network,
    /// Message policy violations - scoped to one message, non-retryable
    Policy,
    /// Stats store errors - never fatal to a cycle
    Storage,
    /// Configuration errors - non-retryable
    Config,
}

/// Relay operation errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway returned status {status}: {body}")]
    Protocol { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl RelayError {
    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) | Self::Timeout(_) => ErrorCategory::Network,
            Self::Protocol { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Client,
            },
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::InvalidMessage(_) => ErrorCategory::Policy,
            Self::Channel(_) => ErrorCategory::Server,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Check if a later scheduled run may succeed where this one failed
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Authentication
                | ErrorCategory::Server
                | ErrorCategory::Network
                | ErrorCategory::Storage
        )
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
