//! Notification producer.
//!
//! Owns the outbound side of the notification pipeline: typed sends, batch
//! fan-out sends, and the retry/dead-letter publications used by the
//! consumer error path. First-class sends are never retried here; the
//! consumer escalation is the sole owner of retry policy.

use std::sync::Arc;

use crate::domain::events::{NotificationEvent, RetryEnvelope, RetryJob};
use crate::domain::routing::{topics, Route, TopicRouter};
use crate::infrastructure::broker::{EventBroker, RecordMetadata};
use crate::infrastructure::metrics;
use crate::shared::error::PipelineError;

use super::dispatch::{Dispatcher, SendHandle};

/// Asynchronous notification dispatcher.
pub struct NotificationProducer {
    broker: Arc<dyn EventBroker>,
    dispatcher: Dispatcher,
    router: TopicRouter,
}

impl NotificationProducer {
    pub fn new(broker: Arc<dyn EventBroker>, router: TopicRouter) -> Self {
        Self {
            dispatcher: Dispatcher::new(broker.clone()),
            broker,
            router,
        }
    }

    /// Send a notification event to its kind-specific topic, keyed by
    /// recipient. Non-blocking; the handle resolves to the broker offset.
    /// Sends with the same key are published in call order.
    pub fn send(&self, event: &NotificationEvent) -> Result<SendHandle, PipelineError> {
        let route = self.router.route_notification(event);
        let payload = serde_json::to_string(event)?;
        Ok(self.dispatcher.dispatch(route, payload))
    }

    /// Publish one record carrying an ordered list of events, used for
    /// fan-out scenarios (notify all prior commenters about one action)
    /// to bound broker traffic.
    pub fn send_batch(
        &self,
        key: &str,
        events: &[NotificationEvent],
    ) -> Result<SendHandle, PipelineError> {
        let route = self.router.route_batch(key);
        let payload = serde_json::to_string(events)?;
        Ok(self.dispatcher.dispatch(route, payload))
    }

    /// Republish a failed job to the retry topic. Awaited inline: the
    /// caller must know the hand-off is durable before acknowledging the
    /// source record.
    pub async fn publish_retry(
        &self,
        envelope: &RetryEnvelope,
    ) -> Result<RecordMetadata, PipelineError> {
        let payload = serde_json::to_string(envelope)?;
        let metadata = self
            .broker
            .publish(topics::NOTIFICATION_RETRY, envelope.job.partition_key(), payload)
            .await?;
        metrics::record_publish(topics::NOTIFICATION_RETRY, true);
        tracing::warn!(
            metadata = %metadata,
            attempts_remaining = envelope.attempts_remaining,
            "Job scheduled for retry"
        );
        Ok(metadata)
    }

    /// Publish a job verbatim to the dead-letter topic for operator
    /// inspection. Terminal: no further automatic action.
    pub async fn publish_dead_letter(
        &self,
        job: &RetryJob,
    ) -> Result<RecordMetadata, PipelineError> {
        let payload = serde_json::to_string(job)?;
        self.publish_dead_letter_raw(job.partition_key(), payload)
            .await
    }

    /// Dead-letter an already-serialized payload (used when the payload
    /// itself cannot be decoded).
    pub async fn publish_dead_letter_raw(
        &self,
        key: &str,
        payload: String,
    ) -> Result<RecordMetadata, PipelineError> {
        let metadata = self
            .broker
            .publish(topics::NOTIFICATION_DLQ, key, payload)
            .await?;
        metrics::record_publish(topics::NOTIFICATION_DLQ, true);
        tracing::error!(metadata = %metadata, key = %key, "Job dead-lettered");
        Ok(metadata)
    }

    /// Route an event without sending. Exposed for wiring and tests.
    pub fn route(&self, event: &NotificationEvent) -> Route {
        self.router.route_notification(event)
    }
}
