//! Notification record handlers.
//!
//! One handler per topic shape: single events, batch records, and retry
//! envelopes. All of them run under `FailurePolicy::Escalate`, so a
//! returned error lands on the retry or dead-letter topic.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::services::NotificationService;
use crate::domain::events::{NotificationEvent, RetryEnvelope, RetryJob};
use crate::infrastructure::broker::Record;
use crate::shared::error::PipelineError;

use super::delivery::RetryPolicy;
use super::worker::RecordHandler;

/// Handles single-event notification topics.
pub struct NotificationRecordHandler {
    service: Arc<NotificationService>,
}

impl NotificationRecordHandler {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RecordHandler for NotificationRecordHandler {
    async fn handle(&self, record: &Record) -> Result<(), PipelineError> {
        let event: NotificationEvent = record.decode()?;
        self.service.save_notification(&event).await?;
        Ok(())
    }
}

/// Handles batch records: one record, many events, one unit of work.
pub struct BatchNotificationHandler {
    service: Arc<NotificationService>,
}

impl BatchNotificationHandler {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RecordHandler for BatchNotificationHandler {
    async fn handle(&self, record: &Record) -> Result<(), PipelineError> {
        let events: Vec<NotificationEvent> = record.decode()?;
        if events.is_empty() {
            tracing::debug!(record_id = %record.id, "Empty batch record, nothing to do");
            return Ok(());
        }
        self.service.save_batch(&events).await?;
        Ok(())
    }
}

/// Handles retry-topic envelopes, pacing each attempt by the policy's
/// fixed backoff before reprocessing the wrapped job.
pub struct RetryNotificationHandler {
    service: Arc<NotificationService>,
    policy: RetryPolicy,
}

impl RetryNotificationHandler {
    pub fn new(service: Arc<NotificationService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }
}

#[async_trait]
impl RecordHandler for RetryNotificationHandler {
    async fn handle(&self, record: &Record) -> Result<(), PipelineError> {
        let envelope: RetryEnvelope = record.decode()?;

        if !self.policy.backoff.is_zero() {
            tokio::time::sleep(self.policy.backoff).await;
        }

        tracing::debug!(
            record_id = %record.id,
            attempts_remaining = envelope.attempts_remaining,
            "Reprocessing retried job"
        );

        match &envelope.job {
            RetryJob::Event { event } => {
                self.service.save_notification(event).await?;
            }
            RetryJob::Batch { events, .. } => {
                self.service.save_batch(events).await?;
            }
        }
        Ok(())
    }
}
