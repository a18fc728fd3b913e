//! In-memory notification repository.
//!
//! Upserts on the `(recipient_id, kind, related_post_id)` idempotency key so
//! at-least-once redelivery of the same logical notification stays a single
//! record.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::entities::{Notification, NotificationRepository};
use crate::domain::events::{NotificationEvent, NotificationKind};
use crate::shared::error::PipelineError;
use crate::shared::snowflake::SnowflakeGenerator;

type IdempotencyKey = (String, NotificationKind, Option<i64>);

/// In-memory `NotificationRepository` implementation.
pub struct InMemoryNotificationRepository {
    snowflake: Arc<SnowflakeGenerator>,
    by_key: DashMap<IdempotencyKey, i64>,
    records: DashMap<i64, Notification>,
}

impl InMemoryNotificationRepository {
    pub fn new(snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self {
            snowflake,
            by_key: DashMap::new(),
            records: DashMap::new(),
        }
    }

    /// Total stored records. Test helper.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, event: &NotificationEvent) -> Result<Notification, PipelineError> {
        let key = Notification::idempotency_key(event);

        // Atomic insert-if-absent on the idempotency key; a duplicate
        // delivery resolves to the existing record.
        let id = *self
            .by_key
            .entry(key)
            .or_insert_with(|| self.snowflake.generate());

        let notification = self
            .records
            .entry(id)
            .or_insert_with(|| Notification {
                id,
                recipient_id: event.recipient_id.clone(),
                kind: event.kind,
                message: event.message.clone(),
                related_post_id: event.related_post_id,
                read: false,
                created_at: Utc::now(),
            })
            .clone();

        Ok(notification)
    }

    async fn save_batch(&self, events: &[NotificationEvent]) -> Result<(), PipelineError> {
        for event in events {
            self.save(event).await?;
        }
        Ok(())
    }

    async fn find_by_recipient(
        &self,
        recipient_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, PipelineError> {
        let mut found: Vec<Notification> = self
            .records
            .iter()
            .filter(|entry| entry.value().recipient_id == recipient_id)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| b.id.cmp(&a.id));
        found.truncate(limit);
        Ok(found)
    }

    async fn count_unread(&self, recipient_id: &str) -> Result<usize, PipelineError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| {
                let n = entry.value();
                n.recipient_id == recipient_id && !n.read
            })
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> InMemoryNotificationRepository {
        InMemoryNotificationRepository::new(Arc::new(SnowflakeGenerator::new(1, 0)))
    }

    #[tokio::test]
    async fn duplicate_delivery_persists_once() {
        let repo = repo();
        let event = NotificationEvent::new("bob", NotificationKind::Comment, "hi", Some(42));

        let first = repo.save(&event).await.unwrap();
        let second = repo.save(&event).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.count_unread("bob").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn distinct_posts_are_distinct_records() {
        let repo = repo();
        let a = NotificationEvent::new("bob", NotificationKind::Like, "x", Some(1));
        let b = NotificationEvent::new("bob", NotificationKind::Like, "x", Some(2));
        repo.save(&a).await.unwrap();
        repo.save(&b).await.unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn batch_persists_all() {
        let repo = repo();
        let events: Vec<_> = (0..5)
            .map(|i| NotificationEvent::new(format!("u{}", i), NotificationKind::Follow, "f", None))
            .collect();
        repo.save_batch(&events).await.unwrap();
        assert_eq!(repo.len(), 5);
    }
}
