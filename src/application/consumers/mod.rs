//! Consumer side: worker pools, handlers, and the retry state machine.

mod chat_consumer;
mod delivery;
mod escalator;
mod notification_consumer;
mod worker;

pub use chat_consumer::ChatPushHandler;
pub use delivery::{DeliveryState, RetryPolicy};
pub use escalator::Escalator;
pub use notification_consumer::{
    BatchNotificationHandler, NotificationRecordHandler, RetryNotificationHandler,
};
pub use worker::{ConsumerGroup, FailurePolicy, RecordHandler};
