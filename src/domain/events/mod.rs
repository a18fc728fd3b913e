//! Event model: immutable value types plus routing metadata.

mod chat;
mod notification;

pub use chat::{ChatEvent, ChatEventKind, ChatPayload};
pub use notification::{NotificationEvent, NotificationKind, RetryEnvelope, RetryJob};
