//! Chat room entity and its store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::PipelineError;

/// A two-party chat room.
///
/// The room ID is a pure function of the participant pair, so there is at
/// most one room per unordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub created_at: DateTime<Utc>,
    pub last_message_time: DateTime<Utc>,

    /// Highest message ID participant A has read
    pub last_read_message_a: Option<i64>,

    /// Highest message ID participant B has read
    pub last_read_message_b: Option<i64>,
}

impl ChatRoom {
    /// Canonical room ID: participants joined in lexicographic order, so
    /// `canonical_id(a, b) == canonical_id(b, a)`.
    pub fn canonical_id(user_a: &str, user_b: &str) -> String {
        if user_a <= user_b {
            format!("{}_{}", user_a, user_b)
        } else {
            format!("{}_{}", user_b, user_a)
        }
    }

    /// New room between two users; participants are stored canonicalized.
    pub fn new(user_a: impl Into<String>, user_b: impl Into<String>) -> Self {
        let (mut a, mut b) = (user_a.into(), user_b.into());
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        let now = Utc::now();
        Self {
            id: format!("{}_{}", a, b),
            participant_a: a,
            participant_b: b,
            created_at: now,
            last_message_time: now,
            last_read_message_a: None,
            last_read_message_b: None,
        }
    }

    /// Whether the user participates in this room.
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// The other participant.
    pub fn peer_of(&self, user_id: &str) -> Option<&str> {
        if self.participant_a == user_id {
            Some(&self.participant_b)
        } else if self.participant_b == user_id {
            Some(&self.participant_a)
        } else {
            None
        }
    }

    /// The user's read cursor.
    pub fn cursor_for(&self, user_id: &str) -> Option<i64> {
        if self.participant_a == user_id {
            self.last_read_message_a
        } else if self.participant_b == user_id {
            self.last_read_message_b
        } else {
            None
        }
    }

    /// Advance the user's read cursor; cursors never move backwards.
    pub fn advance_cursor(&mut self, user_id: &str, message_id: i64) {
        let slot = if self.participant_a == user_id {
            &mut self.last_read_message_a
        } else if self.participant_b == user_id {
            &mut self.last_read_message_b
        } else {
            return;
        };
        if slot.map_or(true, |current| message_id > current) {
            *slot = Some(message_id);
        }
    }
}

/// Store trait for chat room persistence (external collaborator).
#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    /// Atomic insert-if-absent: safe under concurrent first contact from
    /// both directions.
    async fn get_or_create(&self, user_a: &str, user_b: &str) -> Result<ChatRoom, PipelineError>;

    /// Look up a room by its canonical ID.
    async fn find(&self, room_id: &str) -> Result<Option<ChatRoom>, PipelineError>;

    /// All rooms the user participates in.
    async fn rooms_for_user(&self, user_id: &str) -> Result<Vec<ChatRoom>, PipelineError>;

    /// Bump the room's last-message time.
    async fn touch_last_message(
        &self,
        room_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PipelineError>;

    /// Advance a participant's read cursor; returns the updated room.
    async fn advance_cursor(
        &self,
        room_id: &str,
        user_id: &str,
        message_id: i64,
    ) -> Result<ChatRoom, PipelineError>;
}
