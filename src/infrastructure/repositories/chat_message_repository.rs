//! In-memory chat message repository.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::entities::{ChatMessage, ChatMessageRepository};
use crate::shared::error::PipelineError;
use crate::shared::snowflake::SnowflakeGenerator;

/// In-memory `ChatMessageRepository` implementation.
///
/// Deduplication is by primary key only: re-saving a message that already
/// carries its ID returns the stored record. Content-level dedup of two
/// distinct sends is out of scope.
pub struct InMemoryChatMessageRepository {
    snowflake: Arc<SnowflakeGenerator>,
    messages: DashMap<i64, ChatMessage>,
}

impl InMemoryChatMessageRepository {
    pub fn new(snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self {
            snowflake,
            messages: DashMap::new(),
        }
    }

    fn in_room(&self, room_id: &str) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|entry| entry.value().room_id == room_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl ChatMessageRepository for InMemoryChatMessageRepository {
    async fn save(&self, message: &ChatMessage) -> Result<ChatMessage, PipelineError> {
        if message.id != 0 {
            if let Some(existing) = self.messages.get(&message.id) {
                return Ok(existing.clone());
            }
        }

        let mut stored = message.clone();
        if stored.id == 0 {
            stored.id = self.snowflake.generate();
        }
        self.messages.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_unread(
        &self,
        user_id: &str,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, PipelineError> {
        let mut unread: Vec<ChatMessage> = self
            .in_room(room_id)
            .into_iter()
            .filter(|m| m.receiver_id == user_id && !m.read)
            .collect();
        unread.sort_by_key(|m| m.id);
        unread.truncate(limit);
        Ok(unread)
    }

    async fn mark_read(&self, ids: &[i64]) -> Result<(), PipelineError> {
        for id in ids {
            if let Some(mut entry) = self.messages.get_mut(id) {
                entry.read = true;
            }
        }
        Ok(())
    }

    async fn latest_in_room(&self, room_id: &str) -> Result<Option<ChatMessage>, PipelineError> {
        Ok(self
            .in_room(room_id)
            .into_iter()
            .max_by_key(|m| m.id))
    }

    async fn find_in_room(
        &self,
        room_id: &str,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, PipelineError> {
        let mut history: Vec<ChatMessage> = self
            .in_room(room_id)
            .into_iter()
            .filter(|m| before.map_or(true, |b| m.id < b))
            .collect();
        history.sort_by(|a, b| b.id.cmp(&a.id));
        history.truncate(limit);
        Ok(history)
    }

    async fn count_unread_in_room(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<usize, PipelineError> {
        Ok(self
            .in_room(room_id)
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.read)
            .count())
    }

    async fn count_unread(&self, user_id: &str) -> Result<usize, PipelineError> {
        Ok(self
            .messages
            .iter()
            .filter(|entry| {
                let m = entry.value();
                m.receiver_id == user_id && !m.read
            })
            .count())
    }
}
