//! Domain data types

use serde::{Deserialize, Serialize};

/// An outbound message queued on the gateway server.
///
/// The wire contract uses `phone` and `message` as field names; the serde
/// renames keep the Rust side descriptive. Instances are immutable once
/// fetched - the server is the source of truth and the queue is rebuilt on
/// every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    /// Opaque identifier, unique per message, echoed back on confirmation
    pub id: String,

    /// Destination phone number, validated only by the delivery channel
    #[serde(rename = "phone")]
    pub destination: String,

    /// Text payload, at most 160 characters by policy
    #[serde(rename = "message")]
    pub body: String,
}
