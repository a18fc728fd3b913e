//! In-memory chat room repository.
//!
//! Room creation uses the map's atomic entry API, so concurrent first
//! contact from both directions resolves to one room per unordered pair.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::entities::{ChatRoom, ChatRoomRepository};
use crate::shared::error::PipelineError;

/// In-memory `ChatRoomRepository` implementation.
#[derive(Default)]
pub struct InMemoryChatRoomRepository {
    rooms: DashMap<String, ChatRoom>,
}

impl InMemoryChatRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms. Test helper.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl ChatRoomRepository for InMemoryChatRoomRepository {
    async fn get_or_create(&self, user_a: &str, user_b: &str) -> Result<ChatRoom, PipelineError> {
        let id = ChatRoom::canonical_id(user_a, user_b);
        let room = self
            .rooms
            .entry(id)
            .or_insert_with(|| ChatRoom::new(user_a, user_b))
            .clone();
        Ok(room)
    }

    async fn find(&self, room_id: &str) -> Result<Option<ChatRoom>, PipelineError> {
        Ok(self.rooms.get(room_id).map(|entry| entry.clone()))
    }

    async fn rooms_for_user(&self, user_id: &str) -> Result<Vec<ChatRoom>, PipelineError> {
        let mut rooms: Vec<ChatRoom> = self
            .rooms
            .iter()
            .filter(|entry| entry.value().has_participant(user_id))
            .map(|entry| entry.value().clone())
            .collect();
        rooms.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
        Ok(rooms)
    }

    async fn touch_last_message(
        &self,
        room_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| PipelineError::NotFound(format!("chat room {}", room_id)))?;
        if at > room.last_message_time {
            room.last_message_time = at;
        }
        Ok(())
    }

    async fn advance_cursor(
        &self,
        room_id: &str,
        user_id: &str,
        message_id: i64,
    ) -> Result<ChatRoom, PipelineError> {
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| PipelineError::NotFound(format!("chat room {}", room_id)))?;
        room.advance_cursor(user_id, message_id);
        Ok(room.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_symmetric_and_unique() {
        let repo = InMemoryChatRoomRepository::new();
        let r1 = repo.get_or_create("alice", "bob").await.unwrap();
        let r2 = repo.get_or_create("bob", "alice").await.unwrap();
        assert_eq!(r1.id, r2.id);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_contact_creates_one_room() {
        let repo = std::sync::Arc::new(InMemoryChatRoomRepository::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    repo.get_or_create("alice", "bob").await.unwrap()
                } else {
                    repo.get_or_create("bob", "alice").await.unwrap()
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn cursor_advances_through_store() {
        let repo = InMemoryChatRoomRepository::new();
        let room = repo.get_or_create("alice", "bob").await.unwrap();
        let updated = repo.advance_cursor(&room.id, "alice", 99).await.unwrap();
        assert_eq!(updated.cursor_for("alice"), Some(99));
    }
}
