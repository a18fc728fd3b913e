//! Failure escalation: retry topic and dead-letter hand-off.
//!
//! Called by a worker when a handler fails. The escalation publish is
//! awaited before the worker commits the source offset, so a record is
//! only acknowledged once its failure lives durably somewhere else. If the
//! escalation publish itself fails, the worker does not commit and the
//! broker redelivers the record.
//!
//! Dead-letter records carry one shape: a tagged `RetryJob`, whatever path
//! put them there (exhausted budget, permanent failure, zero budget). The
//! single exception is a payload that cannot be decoded at all, which is
//! forwarded verbatim since there is no job to wrap.

use std::sync::Arc;

use crate::application::services::NotificationProducer;
use crate::domain::events::{NotificationEvent, RetryEnvelope, RetryJob};
use crate::domain::routing::topics;
use crate::infrastructure::broker::Record;
use crate::shared::error::PipelineError;

use super::delivery::{DeliveryState, RetryPolicy};

pub struct Escalator {
    producer: Arc<NotificationProducer>,
    policy: RetryPolicy,
}

impl Escalator {
    pub fn new(producer: Arc<NotificationProducer>, policy: RetryPolicy) -> Self {
        Self { producer, policy }
    }

    /// Move a failed record to the retry or dead-letter topic.
    ///
    /// Returns the terminal state of this delivery. An `Err` means the
    /// hand-off itself failed and the caller must not commit.
    pub async fn escalate(
        &self,
        record: &Record,
        error: &PipelineError,
    ) -> Result<DeliveryState, PipelineError> {
        if record.topic == topics::NOTIFICATION_RETRY {
            self.escalate_retry_record(record, error).await
        } else {
            self.escalate_source_record(record, error).await
        }
    }

    /// First failure: wrap the record into a retry job with a full budget.
    async fn escalate_source_record(
        &self,
        record: &Record,
        error: &PipelineError,
    ) -> Result<DeliveryState, PipelineError> {
        let job = match self.job_for(record) {
            Ok(job) => job,
            Err(decode_err) => {
                // Undecodable payloads can never succeed on retry
                tracing::error!(
                    record_id = %record.id,
                    topic = %record.topic,
                    error = %decode_err,
                    "Payload undecodable, dead-lettering verbatim"
                );
                self.producer
                    .publish_dead_letter_raw(&record.key, record.payload.clone())
                    .await?;
                return Ok(DeliveryState::DeadLettered);
            }
        };

        match self.policy.first_failure(error) {
            DeliveryState::RetryScheduled { attempts_remaining } => {
                let envelope = RetryEnvelope::new(job, attempts_remaining);
                self.producer.publish_retry(&envelope).await?;
                Ok(DeliveryState::RetryScheduled { attempts_remaining })
            }
            _ => {
                tracing::warn!(
                    record_id = %record.id,
                    topic = %record.topic,
                    error = %error,
                    class = error.class(),
                    "Dead-lettering without retry"
                );
                self.producer.publish_dead_letter(&job).await?;
                Ok(DeliveryState::DeadLettered)
            }
        }
    }

    /// Subsequent failure: spend one unit of the envelope's budget, or
    /// dead-letter the job once the budget is gone.
    async fn escalate_retry_record(
        &self,
        record: &Record,
        error: &PipelineError,
    ) -> Result<DeliveryState, PipelineError> {
        let envelope: RetryEnvelope = match record.decode() {
            Ok(envelope) => envelope,
            Err(decode_err) => {
                tracing::error!(
                    record_id = %record.id,
                    error = %decode_err,
                    "Retry envelope undecodable, dead-lettering verbatim"
                );
                self.producer
                    .publish_dead_letter_raw(&record.key, record.payload.clone())
                    .await?;
                return Ok(DeliveryState::DeadLettered);
            }
        };

        match self.policy.next_failure(error, &envelope) {
            DeliveryState::RetryScheduled { attempts_remaining } => {
                let next = RetryEnvelope::new(envelope.job, attempts_remaining);
                self.producer.publish_retry(&next).await?;
                Ok(DeliveryState::RetryScheduled { attempts_remaining })
            }
            _ => {
                self.producer.publish_dead_letter(&envelope.job).await?;
                Ok(DeliveryState::DeadLettered)
            }
        }
    }

    fn job_for(&self, record: &Record) -> Result<RetryJob, PipelineError> {
        if record.topic == topics::NOTIFICATION_BATCH {
            let events: Vec<NotificationEvent> = record.decode()?;
            Ok(RetryJob::Batch {
                key: record.key.clone(),
                events,
            })
        } else {
            let event: NotificationEvent = record.decode()?;
            Ok(RetryJob::Event { event })
        }
    }
}
