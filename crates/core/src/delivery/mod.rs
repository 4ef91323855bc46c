//! Delivery cycle: ports and the dispatch service

pub mod ports;
pub mod service;
