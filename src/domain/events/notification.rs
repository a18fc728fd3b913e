//! Notification events and the retry envelope.
//!
//! A `NotificationEvent` is the immutable value produced by a domain action
//! ("user X commented on post Y") and consumed by the notification topics.
//! The retry envelope carries the remaining-attempts counter explicitly so
//! retry state lives in the message, not in call-stack depth.

use serde::{Deserialize, Serialize};

/// Notification categories.
///
/// Unknown kinds on the wire decode to `Generic` so routing never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Like,
    Comment,
    CommentReply,
    Follow,
    #[default]
    #[serde(other)]
    Generic,
}

impl NotificationKind {
    /// Wire/label representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Comment => "COMMENT",
            Self::CommentReply => "COMMENT_REPLY",
            Self::Follow => "FOLLOW",
            Self::Generic => "GENERIC",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable notification event.
///
/// Consumed once per delivery attempt and persisted as a `Notification`
/// record with `read = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Recipient user ID (also the partition key)
    pub recipient_id: String,

    /// Notification category
    pub kind: NotificationKind,

    /// Human-readable message
    pub message: String,

    /// Related post, if any (comment/like notifications)
    pub related_post_id: Option<i64>,
}

impl NotificationEvent {
    pub fn new(
        recipient_id: impl Into<String>,
        kind: NotificationKind,
        message: impl Into<String>,
        related_post_id: Option<i64>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            kind,
            message: message.into(),
            related_post_id,
        }
    }
}

/// The unit of work carried by the retry topic.
///
/// Batches are retried as one unit, never split, so a batch travels through
/// the retry topic as a single job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryJob {
    Event { event: NotificationEvent },
    Batch {
        key: String,
        events: Vec<NotificationEvent>,
    },
}

impl RetryJob {
    /// Partition key preserved across retries so per-recipient ordering
    /// holds within the retry topic too.
    pub fn partition_key(&self) -> &str {
        match self {
            RetryJob::Event { event } => &event.recipient_id,
            RetryJob::Batch { key, .. } => key,
        }
    }
}

/// Retry-topic message: a job plus its remaining retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryEnvelope {
    pub job: RetryJob,
    pub attempts_remaining: u32,
}

impl RetryEnvelope {
    pub fn new(job: RetryJob, attempts_remaining: u32) -> Self {
        Self {
            job,
            attempts_remaining,
        }
    }

    /// Envelope for the next attempt, one unit of budget spent.
    pub fn decremented(&self) -> Option<Self> {
        if self.attempts_remaining > 1 {
            Some(Self {
                job: self.job.clone(),
                attempts_remaining: self.attempts_remaining - 1,
            })
        } else {
            None
        }
    }
}
