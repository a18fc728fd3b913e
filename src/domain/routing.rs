//! Topic routing policy.
//!
//! Pure mapping from an event's logical type to a physical topic and
//! partition key. No side effects, and `route_*` never fails: unknown
//! notification kinds land on the generic topic.

use crate::domain::events::{ChatEvent, ChatEventKind, NotificationEvent, NotificationKind};

/// Topic names at the broker boundary.
pub mod topics {
    pub const NOTIFICATION: &str = "notification";
    pub const NOTIFICATION_LIKE: &str = "notification-like";
    pub const NOTIFICATION_COMMENT: &str = "notification-comment";
    pub const NOTIFICATION_FOLLOW: &str = "notification-follow";
    pub const NOTIFICATION_BATCH: &str = "notification-batch";
    pub const NOTIFICATION_RETRY: &str = "notification-retry";
    pub const NOTIFICATION_DLQ: &str = "notification-dlq";

    pub const CHAT_MESSAGE: &str = "chat-message";
    pub const CHAT_READ: &str = "chat-read";
    pub const CHAT_TYPING: &str = "chat-typing";
    pub const CHAT_STATUS: &str = "chat-status";

    /// Every topic the pipeline uses, in declaration order.
    pub const ALL: &[&str] = &[
        NOTIFICATION,
        NOTIFICATION_LIKE,
        NOTIFICATION_COMMENT,
        NOTIFICATION_FOLLOW,
        NOTIFICATION_BATCH,
        NOTIFICATION_RETRY,
        NOTIFICATION_DLQ,
        CHAT_MESSAGE,
        CHAT_READ,
        CHAT_TYPING,
        CHAT_STATUS,
    ];
}

/// Partition key used for presence events that have no explicit addressee.
pub const PRESENCE_BROADCAST_KEY: &str = "presence";

/// A routing decision: where a record goes and what keys its partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub topic: &'static str,
    pub partition_key: String,
}

/// Central routing policy object.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicRouter;

impl TopicRouter {
    pub fn new() -> Self {
        Self
    }

    /// Notification route: kind selects the topic, the recipient keys the
    /// partition so per-recipient ordering holds.
    pub fn route_notification(&self, event: &NotificationEvent) -> Route {
        let topic = match event.kind {
            NotificationKind::Like => topics::NOTIFICATION_LIKE,
            NotificationKind::Comment | NotificationKind::CommentReply => {
                topics::NOTIFICATION_COMMENT
            }
            NotificationKind::Follow => topics::NOTIFICATION_FOLLOW,
            NotificationKind::Generic => topics::NOTIFICATION,
        };
        Route {
            topic,
            partition_key: event.recipient_id.clone(),
        }
    }

    /// Batch route: the caller-supplied fan-out key partitions the record.
    pub fn route_batch(&self, key: &str) -> Route {
        Route {
            topic: topics::NOTIFICATION_BATCH,
            partition_key: key.to_string(),
        }
    }

    /// Chat route: receiver keys message/read/typing; presence falls back
    /// to the broadcast key when no addressee is set.
    pub fn route_chat(&self, event: &ChatEvent) -> Route {
        let topic = match event.kind() {
            ChatEventKind::Message => topics::CHAT_MESSAGE,
            ChatEventKind::Read => topics::CHAT_READ,
            ChatEventKind::Typing => topics::CHAT_TYPING,
            ChatEventKind::Online | ChatEventKind::Offline => topics::CHAT_STATUS,
        };
        let partition_key = event
            .receiver_id
            .clone()
            .unwrap_or_else(|| PRESENCE_BROADCAST_KEY.to_string());
        Route {
            topic,
            partition_key,
        }
    }
}
