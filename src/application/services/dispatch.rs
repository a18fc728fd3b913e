//! Asynchronous send path shared by the producers.
//!
//! A send never blocks the caller: the publish is enqueued on the ordered
//! lane for its topic partition and the caller receives a completion handle
//! resolving to the broker offset or the transport error. One lane task
//! publishes sequentially, so two sends with the same partition key reach
//! the log in call order even when both handles are dropped
//! (fire-and-forget). Completion is logged either way.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};

use crate::domain::routing::Route;
use crate::infrastructure::broker::{EventBroker, RecordMetadata};
use crate::infrastructure::metrics;
use crate::shared::error::PipelineError;

/// Completion handle for an asynchronous send.
pub struct SendHandle {
    rx: oneshot::Receiver<Result<RecordMetadata, PipelineError>>,
}

impl SendHandle {
    /// Wait for the publish to complete.
    pub async fn resolve(self) -> Result<RecordMetadata, PipelineError> {
        self.rx
            .await
            .map_err(|_| PipelineError::Broker("send lane dropped before completion".into()))?
    }
}

struct SendJob {
    route: Route,
    payload: String,
    done: oneshot::Sender<Result<RecordMetadata, PipelineError>>,
}

/// Per-partition ordered send queues.
///
/// Each (topic, partition) pair gets one lane task that publishes its jobs
/// one at a time, preserving the caller's enqueue order.
pub(crate) struct Dispatcher {
    broker: Arc<dyn EventBroker>,
    lanes: DashMap<(&'static str, u32), mpsc::UnboundedSender<SendJob>>,
}

impl Dispatcher {
    pub(crate) fn new(broker: Arc<dyn EventBroker>) -> Self {
        Self {
            broker,
            lanes: DashMap::new(),
        }
    }

    /// Enqueue a publish on its partition lane and hand back the handle.
    pub(crate) fn dispatch(&self, route: Route, payload: String) -> SendHandle {
        let (tx, rx) = oneshot::channel();
        let partition = self.broker.partition_for_key(&route.partition_key);

        let lane = self
            .lanes
            .entry((route.topic, partition))
            .or_insert_with(|| Self::spawn_lane(self.broker.clone()))
            .clone();

        let job = SendJob {
            route,
            payload,
            done: tx,
        };
        if let Err(mpsc::error::SendError(job)) = lane.send(job) {
            // Lane task gone; surface the failure through the handle
            let _ = job
                .done
                .send(Err(PipelineError::Broker("send lane closed".into())));
        }

        SendHandle { rx }
    }

    fn spawn_lane(broker: Arc<dyn EventBroker>) -> mpsc::UnboundedSender<SendJob> {
        let (tx, mut rx) = mpsc::unbounded_channel::<SendJob>();

        tokio::spawn(async move {
            while let Some(SendJob {
                route,
                payload,
                done,
            }) = rx.recv().await
            {
                let result = broker
                    .publish(route.topic, &route.partition_key, payload)
                    .await;

                match &result {
                    Ok(metadata) => {
                        metrics::record_publish(route.topic, true);
                        tracing::debug!(metadata = %metadata, key = %route.partition_key, "Record published");
                    }
                    Err(err) => {
                        metrics::record_publish(route.topic, false);
                        tracing::error!(topic = route.topic, error = %err, "Error publishing record");
                    }
                }

                // Receiver may have been dropped; fire-and-forget is fine
                let _ = done.send(result);
            }
        });

        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::topics;
    use crate::infrastructure::broker::{wait_for_depth, InMemoryBroker, Record};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn route_for(key: &str) -> Route {
        Route {
            topic: topics::NOTIFICATION,
            partition_key: key.into(),
        }
    }

    #[tokio::test]
    async fn handle_resolves_to_metadata() {
        let broker: Arc<dyn EventBroker> = Arc::new(InMemoryBroker::new(3));
        let dispatcher = Dispatcher::new(broker);
        let metadata = dispatcher
            .dispatch(route_for("bob"), "{}".into())
            .resolve()
            .await
            .unwrap();
        assert_eq!(metadata.topic, topics::NOTIFICATION);
        assert_eq!(metadata.offset, 0);
    }

    /// Broker wrapper that stalls the first publish it sees. A later send
    /// on the same key must still not overtake it.
    struct StallFirstBroker {
        inner: InMemoryBroker,
        stalled: AtomicBool,
    }

    #[async_trait]
    impl EventBroker for StallFirstBroker {
        async fn publish(
            &self,
            topic: &str,
            key: &str,
            payload: String,
        ) -> Result<RecordMetadata, PipelineError> {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.publish(topic, key, payload).await
        }

        async fn poll(
            &self,
            group: &str,
            topic: &str,
            partitions: &[u32],
            max_records: usize,
        ) -> Result<Vec<Record>, PipelineError> {
            self.inner.poll(group, topic, partitions, max_records).await
        }

        async fn commit(
            &self,
            group: &str,
            topic: &str,
            partition: u32,
            offset: u64,
        ) -> Result<(), PipelineError> {
            self.inner.commit(group, topic, partition, offset).await
        }

        fn partitions(&self) -> u32 {
            self.inner.partitions()
        }

        fn partition_for_key(&self, key: &str) -> u32 {
            self.inner.partition_for_key(key)
        }
    }

    #[tokio::test]
    async fn dropped_handles_keep_per_key_send_order() {
        let broker = Arc::new(StallFirstBroker {
            inner: InMemoryBroker::new(3),
            stalled: AtomicBool::new(false),
        });
        let dispatcher = Dispatcher::new(broker.clone());

        // Fire-and-forget: neither handle is awaited
        drop(dispatcher.dispatch(route_for("bob"), "first".into()));
        drop(dispatcher.dispatch(route_for("bob"), "second".into()));

        wait_for_depth(&broker.inner, topics::NOTIFICATION, 2).await;

        let partition = broker.partition_for_key("bob");
        let records = broker
            .inner
            .poll("g", topics::NOTIFICATION, &[partition], 10)
            .await
            .unwrap();
        let payloads: Vec<_> = records.iter().map(|r| r.payload.as_str()).collect();
        assert_eq!(payloads, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn distinct_keys_use_independent_lanes() {
        let broker = Arc::new(InMemoryBroker::new(8));
        let dispatcher = Dispatcher::new(broker.clone());

        for i in 0..4 {
            let route = Route {
                topic: topics::NOTIFICATION,
                partition_key: format!("u{}", i),
            };
            drop(dispatcher.dispatch(route, i.to_string()));
        }

        wait_for_depth(&broker, topics::NOTIFICATION, 4).await;
    }
}
