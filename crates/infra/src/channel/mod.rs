//! Local SMS delivery channel adapters

mod http_sms;

pub use http_sms::HttpSmsChannel;
