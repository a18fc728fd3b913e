//! Application Startup
//!
//! Pipeline wiring and consumer group lifecycle.

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::consumers::{
    BatchNotificationHandler, ChatPushHandler, ConsumerGroup, Escalator, FailurePolicy,
    NotificationRecordHandler, RecordHandler, RetryNotificationHandler, RetryPolicy,
};
use crate::application::services::{
    ChatProducer, ChatService, NotificationProducer, NotificationService, PresenceService,
};
use crate::config::Settings;
use crate::domain::entities::UserDirectory;
use crate::domain::routing::{topics, TopicRouter};
use crate::infrastructure::broker::{EventBroker, InMemoryBroker};
use crate::infrastructure::repositories::{
    InMemoryChatMessageRepository, InMemoryChatRoomRepository, InMemoryNotificationRepository,
    InMemoryUserDirectory,
};
use crate::presentation::push::PushGateway;
use crate::shared::snowflake::SnowflakeGenerator;

/// Fully wired pipeline: broker, stores, services, and the push edge.
pub struct Pipeline {
    pub broker: Arc<InMemoryBroker>,
    pub users: Arc<InMemoryUserDirectory>,
    pub gateway: Arc<PushGateway>,
    pub notification_producer: Arc<NotificationProducer>,
    pub notification_service: Arc<NotificationService>,
    pub chat_producer: Arc<ChatProducer>,
    pub chat_service: Arc<ChatService>,
    pub presence_service: Arc<PresenceService>,
    pub settings: Arc<Settings>,
    retry_policy: RetryPolicy,
}

impl Pipeline {
    /// Wire every component from settings.
    pub fn build(settings: Settings) -> Self {
        let broker = Arc::new(InMemoryBroker::new(settings.broker.partitions));
        let snowflake = Arc::new(SnowflakeGenerator::with_epoch(
            settings.snowflake.machine_id as u64,
            0u64,
            settings.snowflake.epoch,
        ));
        let router = TopicRouter::new();

        let users = Arc::new(InMemoryUserDirectory::new());
        let notifications = Arc::new(InMemoryNotificationRepository::new(snowflake.clone()));
        let messages = Arc::new(InMemoryChatMessageRepository::new(snowflake));
        let rooms = Arc::new(InMemoryChatRoomRepository::new());
        let gateway = Arc::new(PushGateway::new());

        let notification_producer = Arc::new(NotificationProducer::new(broker.clone(), router));
        let notification_service = Arc::new(NotificationService::new(
            notifications,
            users.clone() as Arc<dyn UserDirectory>,
        ));

        let chat_producer = Arc::new(ChatProducer::new(broker.clone(), router));
        let chat_service = Arc::new(ChatService::new(
            messages,
            rooms.clone(),
            chat_producer.clone(),
        ));
        let presence_service = Arc::new(PresenceService::new(rooms, chat_producer.clone()));

        let retry_policy = RetryPolicy::from_settings(&settings.retry);

        tracing::info!(
            partitions = settings.broker.partitions,
            workers = settings.consumer.workers,
            max_attempts = settings.retry.max_attempts,
            "Pipeline wired"
        );

        Self {
            broker,
            users,
            gateway,
            notification_producer,
            notification_service,
            chat_producer,
            chat_service,
            presence_service,
            settings: Arc::new(settings),
            retry_policy,
        }
    }

    /// Start every consumer group. Tasks stop when `shutdown` flips true.
    pub fn spawn_consumers(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let escalator = Arc::new(Escalator::new(
            self.notification_producer.clone(),
            self.retry_policy,
        ));
        let mut handles = Vec::new();

        // Single-event notification topics
        for topic in [
            topics::NOTIFICATION,
            topics::NOTIFICATION_LIKE,
            topics::NOTIFICATION_COMMENT,
            topics::NOTIFICATION_FOLLOW,
        ] {
            let handler: Arc<dyn RecordHandler> = Arc::new(NotificationRecordHandler::new(
                self.notification_service.clone(),
            ));
            handles.extend(self.spawn_group(
                topic,
                handler,
                FailurePolicy::Escalate(escalator.clone()),
                self.settings.consumer.workers,
                self.settings.broker.max_poll_records,
                shutdown.clone(),
            ));
        }

        // Batch topic: fewer workers, smaller polls
        let batch_handler: Arc<dyn RecordHandler> = Arc::new(BatchNotificationHandler::new(
            self.notification_service.clone(),
        ));
        handles.extend(self.spawn_group(
            topics::NOTIFICATION_BATCH,
            batch_handler,
            FailurePolicy::Escalate(escalator.clone()),
            self.settings.consumer.batch_workers,
            self.settings.broker.batch_max_poll_records,
            shutdown.clone(),
        ));

        // Retry topic: paces each attempt by the fixed backoff
        let retry_handler: Arc<dyn RecordHandler> = Arc::new(RetryNotificationHandler::new(
            self.notification_service.clone(),
            self.retry_policy,
        ));
        handles.extend(self.spawn_group(
            topics::NOTIFICATION_RETRY,
            retry_handler,
            FailurePolicy::Escalate(escalator),
            self.settings.consumer.workers,
            self.settings.broker.max_poll_records,
            shutdown.clone(),
        ));

        // Chat topics: best-effort push to connected users
        for topic in [
            topics::CHAT_MESSAGE,
            topics::CHAT_READ,
            topics::CHAT_TYPING,
            topics::CHAT_STATUS,
        ] {
            let handler: Arc<dyn RecordHandler> =
                Arc::new(ChatPushHandler::new(self.gateway.clone()));
            handles.extend(self.spawn_group(
                topic,
                handler,
                FailurePolicy::BestEffort,
                self.settings.consumer.workers,
                self.settings.broker.max_poll_records,
                shutdown.clone(),
            ));
        }

        handles
    }

    fn spawn_group(
        &self,
        topic: &'static str,
        handler: Arc<dyn RecordHandler>,
        failure: FailurePolicy,
        workers: usize,
        max_poll_records: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        ConsumerGroup::new(
            group_name(topic),
            topic,
            self.broker.clone() as Arc<dyn EventBroker>,
            handler,
            failure,
        )
        .workers(workers)
        .max_poll_records(max_poll_records)
        .poll_interval(self.settings.broker.poll_interval())
        .spawn(shutdown)
    }
}

/// Consumer group name for a topic.
fn group_name(topic: &str) -> String {
    format!("{}-group", topic)
}

/// Running application: a wired pipeline plus its consumer tasks.
pub struct Application {
    pipeline: Pipeline,
    shutdown: watch::Sender<bool>,
    consumers: Vec<JoinHandle<()>>,
}

impl Application {
    /// Build the pipeline and start its consumer groups.
    pub fn build(settings: Settings) -> Self {
        let pipeline = Pipeline::build(settings);
        let (shutdown, rx) = watch::channel(false);
        let consumers = pipeline.spawn_consumers(rx);
        Self {
            pipeline,
            shutdown,
            consumers,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run until interrupted, then stop every consumer group.
    pub async fn run_until_stopped(self) -> Result<()> {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown signal received");
        self.stop().await
    }

    /// Flip the shutdown flag and wait for the workers to finish.
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        for result in join_all(self.consumers).await {
            result?;
        }
        tracing::info!("All consumer groups stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> Settings {
        Settings::load().expect("defaults should load")
    }

    #[tokio::test]
    async fn pipeline_builds_from_defaults() {
        let pipeline = Pipeline::build(test_settings());
        assert_eq!(pipeline.broker.partitions(), 3);
    }

    #[tokio::test]
    async fn consumers_start_and_stop() {
        let pipeline = Pipeline::build(test_settings());
        let (tx, rx) = watch::channel(false);
        let handles = pipeline.spawn_consumers(rx);
        assert!(!handles.is_empty());

        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
