//! Gateway server protocol client

mod client;

pub use client::{GatewayClient, GatewayClientConfig};
