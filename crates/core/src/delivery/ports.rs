//! Port interfaces for the delivery cycle

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smsrelay_domain::{PendingMessage, Result};

/// Trait for the gateway server protocol operations
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Fetch the queue of pending messages, in server order
    async fn fetch_pending(&self) -> Result<Vec<PendingMessage>>;

    /// Confirm that the message with the given id was delivered locally
    async fn confirm_sent(&self, id: &str) -> Result<()>;
}

/// Trait for the local message transmission channel.
///
/// The 160-character body policy is enforced by the delivery service, not
/// by implementations of this trait.
#[async_trait]
pub trait SmsChannel: Send + Sync {
    /// Transmit a message body to a destination address
    async fn send(&self, destination: &str, body: &str) -> Result<()>;
}

/// Trait for the persistent delivery counters.
///
/// Synchronous by design: the backing store is a local preferences-style
/// database and at most one delivery cycle runs at a time.
pub trait StatsStore: Send + Sync {
    /// Total number of messages sent by this agent
    fn sent_count(&self) -> Result<u64>;

    /// Timestamp of the most recent successful send, if any
    fn last_sent_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Record one successful send at the given instant
    fn record_sent(&self, at: DateTime<Utc>) -> Result<()>;
}
