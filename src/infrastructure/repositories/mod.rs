//! In-memory implementations of the domain store traits.
//!
//! These are the collaborator-boundary stand-ins: idempotent single and
//! batch writers handed fully-formed domain objects by the consumers.

mod chat_message_repository;
mod chat_room_repository;
mod notification_repository;
mod user_directory;

pub use chat_message_repository::InMemoryChatMessageRepository;
pub use chat_room_repository::InMemoryChatRoomRepository;
pub use notification_repository::InMemoryNotificationRepository;
pub use user_directory::InMemoryUserDirectory;
