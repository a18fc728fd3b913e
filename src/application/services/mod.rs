//! Application services: producers and the domain flows they feed.

mod chat_producer;
mod chat_service;
mod dispatch;
mod notification_producer;
mod notification_service;
mod presence_service;

pub use chat_producer::ChatProducer;
pub use chat_service::{ChatService, RoomSummary};
pub use dispatch::SendHandle;
pub use notification_producer::NotificationProducer;
pub use notification_service::NotificationService;
pub use presence_service::PresenceService;
