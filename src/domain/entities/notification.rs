//! Notification record and its store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::events::{NotificationEvent, NotificationKind};
use crate::shared::error::PipelineError;

/// A persisted notification.
///
/// Created from a consumed `NotificationEvent`, unread by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub related_post_id: Option<i64>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Idempotency key for at-least-once consumption: re-applying the same
    /// logical write must not create a second record.
    pub fn idempotency_key(event: &NotificationEvent) -> (String, NotificationKind, Option<i64>) {
        (
            event.recipient_id.clone(),
            event.kind,
            event.related_post_id,
        )
    }
}

/// Store trait for notification persistence (external collaborator).
///
/// Every operation must be safely re-invocable with the same input, because
/// delivery upstream is at-least-once.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Upsert a notification derived from the event. Keyed on
    /// `(recipient_id, kind, related_post_id)`; a duplicate delivery
    /// returns the existing record.
    async fn save(&self, event: &NotificationEvent) -> Result<Notification, PipelineError>;

    /// Persist a batch, all-or-nothing.
    async fn save_batch(&self, events: &[NotificationEvent]) -> Result<(), PipelineError>;

    /// Notifications for a recipient, newest first.
    async fn find_by_recipient(
        &self,
        recipient_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, PipelineError>;

    /// Count of unread notifications for a recipient.
    async fn count_unread(&self, recipient_id: &str) -> Result<usize, PipelineError>;
}

/// Identity collaborator: resolves whether a referenced user exists.
///
/// A missing user is a permanent failure; retrying a dangling reference
/// cannot succeed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, user_id: &str) -> Result<bool, PipelineError>;
}
