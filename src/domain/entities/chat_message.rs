//! Chat message entity and its store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::PipelineError;

/// Message content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::File => "FILE",
            Self::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A direct chat message between two users.
///
/// Created on send; the only mutation this core performs afterwards is
/// flipping `read`. Deletion belongs to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Snowflake ID (time-ordered, used by read cursors)
    pub id: i64,

    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,

    #[serde(rename = "type")]
    pub message_type: MessageType,

    pub timestamp: DateTime<Utc>,

    /// Whether the receiver has seen this message
    pub read: bool,

    /// Canonical room ID (see `ChatRoom::canonical_id`)
    pub room_id: String,
}

impl ChatMessage {
    /// Build an unsent text message; the ID is assigned on persistence.
    pub fn text(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let sender_id = sender_id.into();
        let receiver_id = receiver_id.into();
        let room_id = super::chat_room::ChatRoom::canonical_id(&sender_id, &receiver_id);
        Self {
            id: 0,
            sender_id,
            receiver_id,
            content: content.into(),
            message_type: MessageType::Text,
            timestamp: Utc::now(),
            read: false,
            room_id,
        }
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }
}

/// Store trait for chat message persistence (external collaborator).
#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// Persist a message. A zero ID means "assign one"; re-saving a message
    /// that already carries its ID is a no-op returning the stored record.
    async fn save(&self, message: &ChatMessage) -> Result<ChatMessage, PipelineError>;

    /// Messages in a room addressed to `user_id` and still unread,
    /// oldest first, bounded by `limit`.
    async fn find_unread(
        &self,
        user_id: &str,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, PipelineError>;

    /// Flip the read flag on the given message IDs. Already-read IDs are
    /// ignored.
    async fn mark_read(&self, ids: &[i64]) -> Result<(), PipelineError>;

    /// Most recent message in a room, if any.
    async fn latest_in_room(&self, room_id: &str) -> Result<Option<ChatMessage>, PipelineError>;

    /// Room history, newest first, keyset-style pagination on message ID.
    async fn find_in_room(
        &self,
        room_id: &str,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, PipelineError>;

    /// Unread count addressed to `user_id` within one room.
    async fn count_unread_in_room(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<usize, PipelineError>;

    /// Unread count addressed to `user_id` across all rooms.
    async fn count_unread(&self, user_id: &str) -> Result<usize, PipelineError>;
}
