//! Delivery service for the fetch-dispatch-confirm cycle.
//!
//! Runs one cycle per invocation: fetch the pending queue from the gateway,
//! send each message through the delivery channel in server order, record
//! counters and confirm each locally successful send. Failures are isolated
//! per message; only a failed fetch aborts the cycle as a whole. A fixed
//! pause between messages throttles the channel.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use smsrelay_domain::{DeliveryConfig, PendingMessage, RelayError, Result};
use tracing::{debug, info, instrument, warn};

use super::ports::{MessageGateway, SmsChannel, StatsStore};

/// Per-message result of one dispatch attempt.
///
/// Explicit instead of exception-shaped so the cycle report and the tests
/// can observe exactly what happened to each message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The channel accepted the message; `confirmed` records whether the
    /// follow-up gateway confirmation also succeeded
    Sent { confirmed: bool },
    /// Rejected by the body-length policy; never offered to the channel
    Rejected,
    /// The channel reported an error; not confirmed, no counters touched
    Failed,
}

/// Aggregate counters for one delivery cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Number of messages returned by the fetch
    pub fetched: usize,
    /// Messages accepted by the channel
    pub sent: usize,
    /// Messages rejected by the length policy
    pub rejected: usize,
    /// Messages the channel failed to send
    pub failed: usize,
    /// Successful sends whose confirmation did not reach the gateway
    pub confirm_failures: usize,
}

/// Delivery service driving one fetch-dispatch-confirm cycle at a time
pub struct DeliveryService {
    gateway: Arc<dyn MessageGateway>,
    channel: Arc<dyn SmsChannel>,
    stats: Arc<dyn StatsStore>,
    config: DeliveryConfig,
}

impl DeliveryService {
    /// Create a new delivery service
    pub fn new(
        gateway: Arc<dyn MessageGateway>,
        channel: Arc<dyn SmsChannel>,
        stats: Arc<dyn StatsStore>,
        config: DeliveryConfig,
    ) -> Self {
        Self { gateway, channel, stats, config }
    }

    /// Run one delivery cycle.
    ///
    /// # Errors
    ///
    /// Returns an error only when the fetch itself fails; per-message
    /// failures are recorded in the report and logged.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let messages = self.gateway.fetch_pending().await?;

        let mut report = CycleReport { fetched: messages.len(), ..CycleReport::default() };

        if messages.is_empty() {
            debug!("No pending messages");
            return Ok(report);
        }

        info!(count = messages.len(), "Dispatching pending messages");

        for message in &messages {
            match self.deliver(message).await {
                DeliveryOutcome::Sent { confirmed } => {
                    report.sent += 1;
                    if !confirmed {
                        report.confirm_failures += 1;
                    }
                }
                DeliveryOutcome::Rejected => report.rejected += 1,
                DeliveryOutcome::Failed => report.failed += 1,
            }

            // Fixed-rate throttle, applied after every message
            tokio::time::sleep(self.config.message_pause()).await;
        }

        info!(
            sent = report.sent,
            rejected = report.rejected,
            failed = report.failed,
            confirm_failures = report.confirm_failures,
            "Delivery cycle completed"
        );

        Ok(report)
    }

    /// Dispatch a single message; never propagates an error
    async fn deliver(&self, message: &PendingMessage) -> DeliveryOutcome {
        if let Err(err) = self.validate(message) {
            warn!(id = %message.id, error = %err, "Message rejected");
            return DeliveryOutcome::Rejected;
        }

        if let Err(err) = self.channel.send(&message.destination, &message.body).await {
            warn!(id = %message.id, error = %err, "Sending failed");
            return DeliveryOutcome::Failed;
        }

        debug!(id = %message.id, destination = %message.destination, "Message sent");

        // Counters are best-effort: a storage failure must not cost the
        // gateway its confirmation
        if let Err(err) = self.stats.record_sent(Utc::now()) {
            warn!(id = %message.id, error = %err, "Failed to update sent counters");
        }

        match self.gateway.confirm_sent(&message.id).await {
            Ok(()) => {
                debug!(id = %message.id, "Delivery confirmed to gateway");
                DeliveryOutcome::Sent { confirmed: true }
            }
            Err(err) => {
                warn!(id = %message.id, error = %err, "Confirmation failed");
                DeliveryOutcome::Sent { confirmed: false }
            }
        }
    }

    fn validate(&self, message: &PendingMessage) -> Result<()> {
        let len = message.body.chars().count();
        if len > self.config.max_body_len {
            return Err(RelayError::InvalidMessage(format!(
                "body too long: {len} chars (max is {})",
                self.config.max_body_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::sync::Mutex as TokioMutex;

    use super::*;

    type SendLog = Arc<TokioMutex<Vec<(String, String)>>>;
    type ConfirmLog = Arc<TokioMutex<Vec<String>>>;
    type ResponseQueue = TokioMutex<Vec<Result<()>>>;

    fn message(id: &str, destination: &str, body: &str) -> PendingMessage {
        PendingMessage {
            id: id.to_string(),
            destination: destination.to_string(),
            body: body.to_string(),
        }
    }

    fn test_config() -> DeliveryConfig {
        DeliveryConfig { message_pause_ms: 0, max_body_len: 160 }
    }

    struct MockGateway {
        pending: TokioMutex<Vec<Result<Vec<PendingMessage>>>>,
        confirm_responses: ResponseQueue,
        confirmed: ConfirmLog,
    }

    impl MockGateway {
        fn new(fetch: Result<Vec<PendingMessage>>) -> Self {
            Self {
                pending: TokioMutex::new(vec![fetch]),
                confirm_responses: TokioMutex::new(Vec::new()),
                confirmed: Arc::new(TokioMutex::new(Vec::new())),
            }
        }

        fn with_confirm_responses(self, responses: Vec<Result<()>>) -> Self {
            Self { confirm_responses: TokioMutex::new(responses), ..self }
        }

        async fn confirmed_ids(&self) -> Vec<String> {
            self.confirmed.lock().await.clone()
        }
    }

    #[async_trait]
    impl MessageGateway for MockGateway {
        async fn fetch_pending(&self) -> Result<Vec<PendingMessage>> {
            let mut pending = self.pending.lock().await;
            if pending.is_empty() {
                Ok(Vec::new())
            } else {
                pending.remove(0)
            }
        }

        async fn confirm_sent(&self, id: &str) -> Result<()> {
            let mut responses = self.confirm_responses.lock().await;
            let result = if responses.is_empty() { Ok(()) } else { responses.remove(0) };
            if result.is_ok() {
                self.confirmed.lock().await.push(id.to_string());
            }
            result
        }
    }

    struct MockChannel {
        responses: ResponseQueue,
        sends: SendLog,
    }

    impl MockChannel {
        fn new(responses: Vec<Result<()>>) -> Self {
            Self {
                responses: TokioMutex::new(responses),
                sends: Arc::new(TokioMutex::new(Vec::new())),
            }
        }

        async fn sent(&self) -> Vec<(String, String)> {
            self.sends.lock().await.clone()
        }
    }

    #[async_trait]
    impl SmsChannel for MockChannel {
        async fn send(&self, destination: &str, body: &str) -> Result<()> {
            let mut responses = self.responses.lock().await;
            let result = if responses.is_empty() { Ok(()) } else { responses.remove(0) };
            if result.is_ok() {
                self.sends.lock().await.push((destination.to_string(), body.to_string()));
            }
            result
        }
    }

    #[derive(Default)]
    struct MockStats {
        count: AtomicU64,
        last: std::sync::Mutex<Option<DateTime<Utc>>>,
        fail_record: bool,
    }

    impl StatsStore for MockStats {
        fn sent_count(&self) -> Result<u64> {
            Ok(self.count.load(Ordering::SeqCst))
        }

        fn last_sent_at(&self) -> Result<Option<DateTime<Utc>>> {
            Ok(*self.last.lock().unwrap())
        }

        fn record_sent(&self, at: DateTime<Utc>) -> Result<()> {
            if self.fail_record {
                return Err(RelayError::Storage("database is locked".into()));
            }
            self.count.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(at);
            Ok(())
        }
    }

    fn service(
        gateway: &Arc<MockGateway>,
        channel: &Arc<MockChannel>,
        stats: &Arc<MockStats>,
    ) -> DeliveryService {
        DeliveryService::new(
            Arc::clone(gateway) as Arc<dyn MessageGateway>,
            Arc::clone(channel) as Arc<dyn SmsChannel>,
            Arc::clone(stats) as Arc<dyn StatsStore>,
            test_config(),
        )
    }

    #[tokio::test]
    async fn dispatch_order_matches_fetch_order() {
        let gateway = Arc::new(MockGateway::new(Ok(vec![
            message("3", "+393", "third"),
            message("1", "+391", "first"),
            message("2", "+392", "second"),
        ])));
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats::default());

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report.sent, 3);
        let destinations: Vec<String> =
            channel.sent().await.into_iter().map(|(to, _)| to).collect();
        assert_eq!(destinations, vec!["+393", "+391", "+392"]);
        assert_eq!(gateway.confirmed_ids().await, vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn oversized_body_never_reaches_channel() {
        let long_body = "x".repeat(161);
        let gateway = Arc::new(MockGateway::new(Ok(vec![message("1", "+391", &long_body)])));
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats::default());

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.sent, 0);
        assert!(channel.sent().await.is_empty());
        assert!(gateway.confirmed_ids().await.is_empty());
        assert_eq!(stats.sent_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn body_of_exactly_160_chars_is_sent() {
        let body = "y".repeat(160);
        let gateway = Arc::new(MockGateway::new(Ok(vec![message("1", "+391", &body)])));
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats::default());

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.rejected, 0);
    }

    #[tokio::test]
    async fn send_failure_skips_confirmation_and_counters() {
        let gateway = Arc::new(MockGateway::new(Ok(vec![message("1", "+391", "hi")])));
        let channel = Arc::new(MockChannel::new(vec![Err(RelayError::Channel(
            "modem unreachable".into(),
        ))]));
        let stats = Arc::new(MockStats::default());

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);
        assert!(gateway.confirmed_ids().await.is_empty());
        assert_eq!(stats.sent_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn successful_send_confirms_exactly_once() {
        let gateway = Arc::new(MockGateway::new(Ok(vec![message("42", "+391", "hi")])));
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats::default());

        service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(gateway.confirmed_ids().await, vec!["42"]);
        assert_eq!(stats.sent_count().unwrap(), 1);
        assert!(stats.last_sent_at().unwrap().is_some());
    }

    #[tokio::test]
    async fn confirmation_failure_does_not_stop_the_cycle() {
        let gateway = Arc::new(
            MockGateway::new(Ok(vec![
                message("1", "+391", "first"),
                message("2", "+392", "second"),
            ]))
            .with_confirm_responses(vec![
                Err(RelayError::Protocol { status: 500, body: "boom".into() }),
                Ok(()),
            ]),
        );
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats::default());

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.confirm_failures, 1);
        // The counter already reflects both sends despite the failed confirm
        assert_eq!(stats.sent_count().unwrap(), 2);
        assert_eq!(gateway.confirmed_ids().await, vec!["2"]);
    }

    #[tokio::test]
    async fn counter_increments_only_on_successful_sends() {
        let gateway = Arc::new(MockGateway::new(Ok(vec![
            message("1", "+391", "ok"),
            message("2", "+392", "fails"),
            message("3", "+393", "ok"),
        ])));
        let channel = Arc::new(MockChannel::new(vec![
            Ok(()),
            Err(RelayError::Channel("busy".into())),
            Ok(()),
        ]));
        let stats = Arc::new(MockStats::default());

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(stats.sent_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn storage_failure_still_confirms_delivery() {
        let gateway = Arc::new(MockGateway::new(Ok(vec![message("1", "+391", "hi")])));
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats { fail_record: true, ..MockStats::default() });

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(gateway.confirmed_ids().await, vec!["1"]);
    }

    #[tokio::test]
    async fn empty_queue_dispatches_nothing() {
        let gateway = Arc::new(MockGateway::new(Ok(vec![])));
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats::default());

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report, CycleReport::default());
        assert!(channel.sent().await.is_empty());
        assert!(gateway.confirmed_ids().await.is_empty());
    }

    #[tokio::test]
    async fn fetch_error_aborts_the_cycle() {
        let gateway = Arc::new(MockGateway::new(Err(RelayError::Protocol {
            status: 500,
            body: "server down".into(),
        })));
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats::default());

        let result = service(&gateway, &channel, &stats).run_cycle().await;

        assert!(matches!(result, Err(RelayError::Protocol { status: 500, .. })));
        assert!(channel.sent().await.is_empty());
    }

    #[tokio::test]
    async fn mixed_queue_scenario() {
        // Message "1" is valid; message "2" is one character over the limit
        let long_body = "z".repeat(161);
        let gateway = Arc::new(MockGateway::new(Ok(vec![
            message("1", "+391", "hi"),
            message("2", "+392", &long_body),
        ])));
        let channel = Arc::new(MockChannel::new(vec![]));
        let stats = Arc::new(MockStats::default());

        let report = service(&gateway, &channel, &stats).run_cycle().await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(gateway.confirmed_ids().await, vec!["1"]);
        assert_eq!(channel.sent().await.len(), 1);
        assert_eq!(stats.sent_count().unwrap(), 1);
    }
}
