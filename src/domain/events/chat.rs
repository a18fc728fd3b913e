//! Chat events.
//!
//! The payload is a closed tagged union decoded exhaustively at the broker
//! boundary; event kind is derived from the payload, so a MESSAGE event can
//! never carry a typing flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::ChatMessage;

/// Chat event kinds as they appear on the wire and in topic routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatEventKind {
    Message,
    Read,
    Typing,
    Online,
    Offline,
}

impl ChatEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "MESSAGE",
            Self::Read => "READ",
            Self::Typing => "TYPING",
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
        }
    }
}

impl std::fmt::Display for ChatEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event payload, one variant per event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatPayload {
    /// A chat message body
    Message(ChatMessage),

    /// Read-cursor marker: the last message ID the reader has seen
    Read { last_read_message_id: i64 },

    /// Typing flag
    Typing { typing: bool },

    /// Presence flag (ONLINE when true, OFFLINE when false)
    Presence { online: bool },
}

/// A chat event flowing through the chat topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Originating user
    pub sender_id: String,

    /// Addressed user, if the event targets a single peer
    pub receiver_id: Option<String>,

    /// Room the event belongs to, if any (presence events have none)
    pub room_id: Option<String>,

    /// Event payload, tagged by kind
    pub payload: ChatPayload,

    /// Event creation time
    pub timestamp: DateTime<Utc>,
}

impl ChatEvent {
    /// Kind derived from the payload.
    pub fn kind(&self) -> ChatEventKind {
        match &self.payload {
            ChatPayload::Message(_) => ChatEventKind::Message,
            ChatPayload::Read { .. } => ChatEventKind::Read,
            ChatPayload::Typing { .. } => ChatEventKind::Typing,
            ChatPayload::Presence { online: true } => ChatEventKind::Online,
            ChatPayload::Presence { online: false } => ChatEventKind::Offline,
        }
    }

    /// MESSAGE event wrapping a persisted chat message.
    pub fn message_event(message: ChatMessage) -> Self {
        Self {
            sender_id: message.sender_id.clone(),
            receiver_id: Some(message.receiver_id.clone()),
            room_id: Some(message.room_id.clone()),
            timestamp: Utc::now(),
            payload: ChatPayload::Message(message),
        }
    }

    /// READ event telling the peer how far the reader has caught up.
    pub fn read_event(
        reader_id: impl Into<String>,
        peer_id: impl Into<String>,
        room_id: impl Into<String>,
        last_read_message_id: i64,
    ) -> Self {
        Self {
            sender_id: reader_id.into(),
            receiver_id: Some(peer_id.into()),
            room_id: Some(room_id.into()),
            payload: ChatPayload::Read {
                last_read_message_id,
            },
            timestamp: Utc::now(),
        }
    }

    /// TYPING event for a room peer.
    pub fn typing_event(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        room_id: impl Into<String>,
        typing: bool,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: Some(receiver_id.into()),
            room_id: Some(room_id.into()),
            payload: ChatPayload::Typing { typing },
            timestamp: Utc::now(),
        }
    }

    /// ONLINE/OFFLINE presence event. The addressee is filled in by the
    /// presence fan-out, one event per room peer.
    pub fn presence_event(user_id: impl Into<String>, online: bool) -> Self {
        Self {
            sender_id: user_id.into(),
            receiver_id: None,
            room_id: None,
            payload: ChatPayload::Presence { online },
            timestamp: Utc::now(),
        }
    }

    /// Copy of this event addressed to a specific peer.
    pub fn addressed_to(mut self, receiver_id: impl Into<String>) -> Self {
        self.receiver_id = Some(receiver_id.into());
        self
    }
}
