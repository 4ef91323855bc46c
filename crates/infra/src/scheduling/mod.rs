//! Periodic delivery scheduling

mod delivery_scheduler;
mod error;

pub use delivery_scheduler::DeliveryScheduler;
pub use error::{SchedulerError, SchedulerResult};
