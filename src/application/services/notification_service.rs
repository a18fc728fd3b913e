//! Notification application service.
//!
//! Invoked by the notification consumers for each delivered record. Every
//! operation is idempotent because delivery is at-least-once: the store
//! upserts on the event's identity key, so a redelivered record persists
//! nothing new.

use std::sync::Arc;

use crate::domain::entities::{Notification, NotificationRepository, UserDirectory};
use crate::domain::events::NotificationEvent;
use crate::shared::error::PipelineError;

pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserDirectory>,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn NotificationRepository>, users: Arc<dyn UserDirectory>) -> Self {
        Self { repository, users }
    }

    /// Persist one consumed event.
    ///
    /// The recipient is resolved first; a dangling reference is a permanent
    /// failure and must not burn retry budget.
    pub async fn save_notification(
        &self,
        event: &NotificationEvent,
    ) -> Result<Notification, PipelineError> {
        self.resolve_recipient(&event.recipient_id).await?;
        let notification = self.repository.save(event).await?;
        tracing::debug!(
            recipient = %notification.recipient_id,
            kind = %notification.kind,
            notification_id = notification.id,
            "Notification persisted"
        );
        Ok(notification)
    }

    /// Persist a consumed batch as one unit.
    ///
    /// Recipients are all resolved before any write, so a batch either
    /// persists entirely or not at all and can be retried as a whole.
    pub async fn save_batch(&self, events: &[NotificationEvent]) -> Result<(), PipelineError> {
        for event in events {
            self.resolve_recipient(&event.recipient_id).await?;
        }
        self.repository.save_batch(events).await?;
        tracing::debug!(count = events.len(), "Notification batch persisted");
        Ok(())
    }

    /// Notifications for a recipient, newest first.
    pub async fn notifications_for(
        &self,
        recipient_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, PipelineError> {
        self.repository.find_by_recipient(recipient_id, limit).await
    }

    /// Unread notification count for a recipient.
    pub async fn count_unread(&self, recipient_id: &str) -> Result<usize, PipelineError> {
        self.repository.count_unread(recipient_id).await
    }

    async fn resolve_recipient(&self, recipient_id: &str) -> Result<(), PipelineError> {
        if self.users.exists(recipient_id).await? {
            Ok(())
        } else {
            Err(PipelineError::Resolution(format!(
                "recipient does not exist: {}",
                recipient_id
            )))
        }
    }
}
