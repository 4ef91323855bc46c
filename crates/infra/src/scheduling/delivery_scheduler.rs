//! Delivery scheduler for periodic cycle execution.
//!
//! Drives the delivery service on a fixed interval with explicit lifecycle
//! management: the background task is tracked by its join handle,
//! cancellation is explicit, and stop waits for the in-flight cycle to
//! finish. Cycles never overlap - the next tick is not armed until the
//! current cycle returns. A failed cycle is logged and the next tick
//! retries from scratch; nothing is fatal to the host process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use smsrelay_core::DeliveryService;
use smsrelay_domain::SchedulerConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Delivery scheduler with explicit lifecycle management
pub struct DeliveryScheduler {
    service: Arc<DeliveryService>,
    config: SchedulerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl DeliveryScheduler {
    /// Create a new scheduler around the given delivery service
    pub fn new(service: Arc<DeliveryService>, config: SchedulerConfig) -> Self {
        Self {
            service,
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Start the scheduler, spawning the background cycle task
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::AlreadyRunning` if already started
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.poll_interval_secs, "Starting delivery scheduler");

        // Fresh token so the scheduler can be restarted after a stop
        self.cancellation = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let interval = self.config.poll_interval();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::cycle_loop(service, interval, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("Delivery scheduler started");

        Ok(())
    }

    /// Stop the scheduler and wait for the in-flight cycle to finish
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NotRunning` if not started, `Timeout` or
    /// `TaskJoinFailed` if the background task misbehaves on shutdown
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping delivery scheduler");

        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Scheduler task panicked: {}", e);
                    return Err(SchedulerError::TaskJoinFailed(e.to_string()));
                }
                Err(_) => {
                    warn!("Scheduler task did not complete within timeout");
                    return Err(SchedulerError::Timeout { seconds: JOIN_TIMEOUT.as_secs() });
                }
            }
        }

        info!("Delivery scheduler stopped");
        Ok(())
    }

    /// Returns true when the background task is active
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().map(|handle| !handle.is_finished()).unwrap_or(false)
    }

    /// Background cycle loop
    async fn cycle_loop(
        service: Arc<DeliveryService>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Delivery cycle loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let started = Instant::now();

                    match service.run_cycle().await {
                        Ok(report) => {
                            debug!(
                                fetched = report.fetched,
                                sent = report.sent,
                                duration_ms = started.elapsed().as_millis() as u64,
                                "Delivery cycle finished"
                            );
                        }
                        Err(e) => {
                            // Recoverable by design: the next tick starts over
                            error!(
                                error = %e,
                                retryable = e.should_retry(),
                                "Delivery cycle failed"
                            );
                        }
                    }
                }
            }
        }
    }
}

impl Drop for DeliveryScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("DeliveryScheduler dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
