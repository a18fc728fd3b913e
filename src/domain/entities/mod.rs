//! Domain entities and their collaborator store traits.

mod chat_message;
mod chat_room;
mod notification;

pub use chat_message::{ChatMessage, ChatMessageRepository, MessageType};
pub use chat_room::{ChatRoom, ChatRoomRepository};
pub use notification::{Notification, NotificationRepository, UserDirectory};

#[cfg(test)]
pub use notification::MockUserDirectory;
