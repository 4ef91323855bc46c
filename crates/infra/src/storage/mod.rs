//! Persistent storage for delivery counters

mod stats_store;

pub use stats_store::SqliteStatsStore;
