//! Domain layer: event model, entities, store traits, routing policy.

pub mod entities;
pub mod events;
pub mod routing;

pub use entities::{
    ChatMessage, ChatMessageRepository, ChatRoom, ChatRoomRepository, MessageType, Notification,
    NotificationRepository, UserDirectory,
};
pub use events::{
    ChatEvent, ChatEventKind, ChatPayload, NotificationEvent, NotificationKind, RetryEnvelope,
    RetryJob,
};
pub use routing::{Route, TopicRouter};
