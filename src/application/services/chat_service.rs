//! Chat application service.
//!
//! Owns the send/read/history flows for two-party rooms. Messages are
//! persisted before their event is published, so a consumer can always
//! resolve what it is delivering; room state (last-message time, read
//! cursors) is updated on the same path.

use std::sync::Arc;

use crate::domain::entities::{
    ChatMessage, ChatMessageRepository, ChatRoom, ChatRoomRepository, MessageType,
};
use crate::shared::error::PipelineError;

use super::chat_producer::ChatProducer;

/// Upper bound on unread messages flipped per mark-read call.
const READ_SCAN_LIMIT: usize = 100;

/// A user's view of one room: the room plus their unread count.
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub room: ChatRoom,
    pub unread_count: usize,
    pub latest_message: Option<ChatMessage>,
}

pub struct ChatService {
    messages: Arc<dyn ChatMessageRepository>,
    rooms: Arc<dyn ChatRoomRepository>,
    producer: Arc<ChatProducer>,
}

impl ChatService {
    pub fn new(
        messages: Arc<dyn ChatMessageRepository>,
        rooms: Arc<dyn ChatRoomRepository>,
        producer: Arc<ChatProducer>,
    ) -> Self {
        Self {
            messages,
            rooms,
            producer,
        }
    }

    /// Send a direct message: persist it, update the room, publish the
    /// MESSAGE event. Returns the persisted message with its assigned ID.
    pub async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        message_type: MessageType,
    ) -> Result<ChatMessage, PipelineError> {
        let message = ChatMessage::text(sender_id, receiver_id, content).with_type(message_type);

        self.rooms.get_or_create(sender_id, receiver_id).await?;
        let saved = self.messages.save(&message).await?;
        self.rooms
            .touch_last_message(&saved.room_id, saved.timestamp)
            .await?;

        tracing::debug!(
            room = %saved.room_id,
            message_id = saved.id,
            "Message persisted, publishing event"
        );
        self.producer.send_message_event(saved.clone())?;

        Ok(saved)
    }

    /// Mark the reader's side of a room as read.
    ///
    /// Flips unread messages addressed to the reader (bounded scan),
    /// advances the reader's cursor to the newest message in the room, and
    /// tells the peer via a single READ event. Returns the number of
    /// messages flipped and the reader's cursor afterwards. With nothing
    /// unread the call is a no-op: the cursor stays put and no event is
    /// emitted, even when the reader authored the room's latest message.
    pub async fn mark_read(
        &self,
        room_id: &str,
        reader_id: &str,
    ) -> Result<(usize, Option<i64>), PipelineError> {
        let room = self.require_participant(room_id, reader_id).await?;

        let unread = self
            .messages
            .find_unread(reader_id, room_id, READ_SCAN_LIMIT)
            .await?;
        if unread.is_empty() {
            return Ok((0, room.cursor_for(reader_id)));
        }

        let ids: Vec<i64> = unread.iter().map(|m| m.id).collect();
        self.messages.mark_read(&ids).await?;

        // Cursor target is the newest message in the room, which may be
        // the reader's own reply sent after the unread batch
        let newest_unread = ids[ids.len() - 1];
        let cursor_target = match self.messages.latest_in_room(room_id).await? {
            Some(latest) => latest.id.max(newest_unread),
            None => newest_unread,
        };

        let updated = self
            .rooms
            .advance_cursor(room_id, reader_id, cursor_target)
            .await?;

        if let Some(peer) = room.peer_of(reader_id) {
            self.producer
                .send_read_receipt(reader_id, peer, room_id, cursor_target)?;
        }

        Ok((unread.len(), updated.cursor_for(reader_id)))
    }

    /// Resolve (or create) the room between two users. Symmetric: both
    /// argument orders return the same room.
    pub async fn resolve_room(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<ChatRoom, PipelineError> {
        self.rooms.get_or_create(user_a, user_b).await
    }

    /// Room history, newest first, keyset pagination on message ID. Only
    /// participants may read it.
    pub async fn messages(
        &self,
        room_id: &str,
        requester_id: &str,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, PipelineError> {
        self.require_participant(room_id, requester_id).await?;
        self.messages.find_in_room(room_id, before, limit).await
    }

    /// All rooms the user participates in, most recently active first,
    /// each with the user's unread count and the latest message.
    pub async fn rooms(&self, user_id: &str) -> Result<Vec<RoomSummary>, PipelineError> {
        let rooms = self.rooms.rooms_for_user(user_id).await?;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let unread_count = self.messages.count_unread_in_room(&room.id, user_id).await?;
            let latest_message = self.messages.latest_in_room(&room.id).await?;
            summaries.push(RoomSummary {
                room,
                unread_count,
                latest_message,
            });
        }
        Ok(summaries)
    }

    /// Publish a typing indicator to the room peer.
    pub async fn send_typing(
        &self,
        room_id: &str,
        sender_id: &str,
        typing: bool,
    ) -> Result<(), PipelineError> {
        let room = self.require_participant(room_id, sender_id).await?;
        if let Some(peer) = room.peer_of(sender_id) {
            self.producer.send_typing(sender_id, peer, room_id, typing)?;
        }
        Ok(())
    }

    /// Unread count for the user within one room.
    pub async fn unread_in_room(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<usize, PipelineError> {
        self.require_participant(room_id, user_id).await?;
        self.messages.count_unread_in_room(room_id, user_id).await
    }

    /// Unread count for the user across all rooms.
    pub async fn unread_total(&self, user_id: &str) -> Result<usize, PipelineError> {
        self.messages.count_unread(user_id).await
    }

    async fn require_participant(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<ChatRoom, PipelineError> {
        let room = self
            .rooms
            .find(room_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("room not found: {}", room_id)))?;
        if !room.has_participant(user_id) {
            return Err(PipelineError::Forbidden(format!(
                "user {} is not a participant of room {}",
                user_id, room_id
            )));
        }
        Ok(room)
    }
}
