//! Consumer group worker pool.
//!
//! A `ConsumerGroup` runs N worker tasks over one topic. Worker `i` owns
//! the partitions where `partition % workers == i`, so a partition is only
//! ever read by one task and per-partition ordering survives concurrency.
//!
//! Offsets are committed per record, after the handler succeeds or after a
//! failure has been durably handed to the retry/dead-letter topics. A
//! failed escalation commits nothing and the record is redelivered.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::infrastructure::broker::{EventBroker, Record};
use crate::infrastructure::metrics;
use crate::shared::error::PipelineError;

use super::delivery::DeliveryState;
use super::escalator::Escalator;

/// Per-record processing logic plugged into a consumer group.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    async fn handle(&self, record: &Record) -> Result<(), PipelineError>;
}

/// What a worker does when the handler fails.
pub enum FailurePolicy {
    /// Hand the failure to the retry/dead-letter topics, then commit.
    Escalate(Arc<Escalator>),

    /// Log and commit. Used by chat topics, where the source of truth is
    /// already persisted and a lost push is acceptable.
    BestEffort,
}

pub struct ConsumerGroup {
    name: String,
    topic: &'static str,
    broker: Arc<dyn EventBroker>,
    handler: Arc<dyn RecordHandler>,
    failure: FailurePolicy,
    workers: usize,
    max_poll_records: usize,
    poll_interval: Duration,
}

impl ConsumerGroup {
    pub fn new(
        name: impl Into<String>,
        topic: &'static str,
        broker: Arc<dyn EventBroker>,
        handler: Arc<dyn RecordHandler>,
        failure: FailurePolicy,
    ) -> Self {
        Self {
            name: name.into(),
            topic,
            broker,
            handler,
            failure,
            workers: 1,
            max_poll_records: 500,
            poll_interval: Duration::from_millis(25),
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn max_poll_records(mut self, max_poll_records: usize) -> Self {
        self.max_poll_records = max_poll_records.max(1);
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Start the worker tasks. They run until `shutdown` flips to true.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let group = Arc::new(self);
        (0..group.workers)
            .map(|worker_index| {
                let group = group.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    group.run_worker(worker_index, shutdown).await;
                })
            })
            .collect()
    }

    fn owned_partitions(&self, worker_index: usize) -> Vec<u32> {
        (0..self.broker.partitions())
            .filter(|p| (*p as usize) % self.workers == worker_index)
            .collect()
    }

    async fn run_worker(&self, worker_index: usize, mut shutdown: watch::Receiver<bool>) {
        let partitions = self.owned_partitions(worker_index);
        tracing::info!(
            group = %self.name,
            topic = self.topic,
            worker = worker_index,
            ?partitions,
            "Consumer worker started"
        );

        while !*shutdown.borrow() {
            let records = match self
                .broker
                .poll(&self.name, self.topic, &partitions, self.max_poll_records)
                .await
            {
                Ok(records) => records,
                Err(err) => {
                    tracing::error!(group = %self.name, error = %err, "Poll failed");
                    Vec::new()
                }
            };

            if records.is_empty() {
                tokio::select! {
                    _ = shutdown.changed() => {}
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
                continue;
            }

            for record in &records {
                if *shutdown.borrow() {
                    break;
                }
                if !self.process(record).await {
                    // Escalation failed: leave the offset where it is and
                    // let the next poll redeliver from there
                    break;
                }
            }
        }

        tracing::info!(group = %self.name, worker = worker_index, "Consumer worker stopped");
    }

    /// Process one record. Returns false when nothing could be committed.
    async fn process(&self, record: &Record) -> bool {
        let started = Instant::now();
        let result = self.handler.handle(record).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(()) => {
                self.commit_next(record).await;
                metrics::record_consumption(self.topic, DeliveryState::Acked.outcome(), elapsed);
                true
            }
            Err(err) => match &self.failure {
                FailurePolicy::BestEffort => {
                    tracing::warn!(
                        group = %self.name,
                        record_id = %record.id,
                        error = %err,
                        "Handler failed, acknowledging anyway"
                    );
                    self.commit_next(record).await;
                    metrics::record_consumption(self.topic, DeliveryState::Acked.outcome(), elapsed);
                    true
                }
                FailurePolicy::Escalate(escalator) => {
                    match escalator.escalate(record, &err).await {
                        Ok(state) => {
                            self.commit_next(record).await;
                            metrics::record_consumption(self.topic, state.outcome(), elapsed);
                            true
                        }
                        Err(escalation_err) => {
                            tracing::error!(
                                group = %self.name,
                                record_id = %record.id,
                                error = %escalation_err,
                                "Escalation failed, record will be redelivered"
                            );
                            false
                        }
                    }
                }
            },
        }
    }

    async fn commit_next(&self, record: &Record) {
        if let Err(err) = self
            .broker
            .commit(&self.name, self.topic, record.partition, record.offset + 1)
            .await
        {
            tracing::error!(group = %self.name, error = %err, "Offset commit failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::topics;
    use crate::infrastructure::broker::InMemoryBroker;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        seen: AtomicUsize,
        fail_first: AtomicUsize,
    }

    #[async_trait]
    impl RecordHandler for Counting {
        async fn handle(&self, _record: &Record) -> Result<(), PipelineError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(PipelineError::Handler("transient".into()));
            }
            Ok(())
        }
    }

    async fn wait_until(check: impl Fn() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !check() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition never satisfied"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn workers_drain_all_partitions() {
        let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new(3));
        for i in 0..12 {
            broker
                .publish(topics::NOTIFICATION, &format!("u{}", i), "{}".into())
                .await
                .unwrap();
        }

        let handler = Arc::new(Counting {
            seen: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
        });
        let (tx, rx) = watch::channel(false);
        let handles = ConsumerGroup::new(
            "notification-group",
            topics::NOTIFICATION,
            broker.clone(),
            handler.clone(),
            FailurePolicy::BestEffort,
        )
        .workers(3)
        .poll_interval(Duration::from_millis(5))
        .spawn(rx);

        wait_until(|| handler.seen.load(Ordering::SeqCst) >= 12).await;
        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        // Everything was committed: a fresh poll of each partition is empty
        for p in 0..3 {
            assert!(broker
                .poll("notification-group", topics::NOTIFICATION, &[p], 10)
                .await
                .unwrap()
                .is_empty());
        }
    }

    #[tokio::test]
    async fn best_effort_commits_past_failures() {
        let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new(1));
        broker
            .publish(topics::CHAT_TYPING, "bob", "{}".into())
            .await
            .unwrap();

        let handler = Arc::new(Counting {
            seen: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(1),
        });
        let (tx, rx) = watch::channel(false);
        let handles = ConsumerGroup::new(
            "chat-typing-group",
            topics::CHAT_TYPING,
            broker.clone(),
            handler.clone(),
            FailurePolicy::BestEffort,
        )
        .poll_interval(Duration::from_millis(5))
        .spawn(rx);

        wait_until(|| handler.seen.load(Ordering::SeqCst) >= 1).await;
        // Give the commit a moment, then confirm no redelivery happens
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(handler.seen.load(Ordering::SeqCst), 1);
    }
}
