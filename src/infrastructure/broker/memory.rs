//! In-memory partitioned broker.
//!
//! Append-only per-partition logs with per-(group, topic, partition)
//! committed offsets. Keys hash to partitions with SHA-256 so placement is
//! stable across processes, unlike the std `DefaultHasher`.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::PipelineError;

use super::{EventBroker, Record, RecordMetadata};

#[derive(Clone)]
struct StoredRecord {
    id: Uuid,
    key: String,
    payload: String,
    timestamp: chrono::DateTime<Utc>,
}

struct TopicLog {
    partitions: Vec<RwLock<Vec<StoredRecord>>>,
}

impl TopicLog {
    fn new(partitions: u32) -> Self {
        Self {
            partitions: (0..partitions).map(|_| RwLock::new(Vec::new())).collect(),
        }
    }
}

/// In-memory `EventBroker` implementation.
pub struct InMemoryBroker {
    partition_count: u32,
    topics: DashMap<String, Arc<TopicLog>>,
    /// (group, topic, partition) -> next offset to read
    offsets: DashMap<(String, String, u32), u64>,
}

impl InMemoryBroker {
    pub fn new(partition_count: u32) -> Self {
        Self {
            partition_count: partition_count.max(1),
            topics: DashMap::new(),
            offsets: DashMap::new(),
        }
    }

    fn topic(&self, name: &str) -> Arc<TopicLog> {
        self.topics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(TopicLog::new(self.partition_count)))
            .clone()
    }

    fn committed(&self, group: &str, topic: &str, partition: u32) -> u64 {
        self.offsets
            .get(&(group.to_string(), topic.to_string(), partition))
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    /// Total records appended to a topic, across partitions. Test helper.
    pub fn depth(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|log| log.partitions.iter().map(|p| p.read().len()).sum())
            .unwrap_or(0)
    }
}

/// Poll until the topic holds at least `depth` records. Test helper for
/// sends that complete on a spawned task; panics after two seconds.
pub async fn wait_for_depth(broker: &InMemoryBroker, topic: &str, depth: usize) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    loop {
        if broker.depth(topic) >= depth {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!(
                "topic {} never reached depth {} (at {})",
                topic,
                depth,
                broker.depth(topic)
            );
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}

#[async_trait]
impl EventBroker for InMemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: String,
    ) -> Result<RecordMetadata, PipelineError> {
        let partition = self.partition_for_key(key);
        let log = self.topic(topic);
        let mut records = log.partitions[partition as usize].write();
        let offset = records.len() as u64;
        records.push(StoredRecord {
            id: Uuid::now_v7(),
            key: key.to_string(),
            payload,
            timestamp: Utc::now(),
        });

        Ok(RecordMetadata {
            topic: topic.to_string(),
            partition,
            offset,
        })
    }

    async fn poll(
        &self,
        group: &str,
        topic: &str,
        partitions: &[u32],
        max_records: usize,
    ) -> Result<Vec<Record>, PipelineError> {
        let log = self.topic(topic);
        let mut out = Vec::new();

        for &partition in partitions {
            if partition >= self.partition_count {
                return Err(PipelineError::Broker(format!(
                    "partition {} out of range for topic {}",
                    partition, topic
                )));
            }
            if out.len() >= max_records {
                break;
            }
            let committed = self.committed(group, topic, partition);
            let records = log.partitions[partition as usize].read();
            let remaining = max_records - out.len();
            for (i, stored) in records
                .iter()
                .enumerate()
                .skip(committed as usize)
                .take(remaining)
            {
                out.push(Record {
                    id: stored.id,
                    topic: topic.to_string(),
                    partition,
                    offset: i as u64,
                    key: stored.key.clone(),
                    payload: stored.payload.clone(),
                    timestamp: stored.timestamp,
                });
            }
        }

        Ok(out)
    }

    async fn commit(
        &self,
        group: &str,
        topic: &str,
        partition: u32,
        offset: u64,
    ) -> Result<(), PipelineError> {
        let key = (group.to_string(), topic.to_string(), partition);
        let mut entry = self.offsets.entry(key).or_insert(0);
        if offset > *entry {
            *entry = offset;
        }
        Ok(())
    }

    fn partitions(&self) -> u32 {
        self.partition_count
    }

    fn partition_for_key(&self, key: &str) -> u32 {
        let digest = Sha256::digest(key.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(bytes) % self.partition_count as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_lands_on_same_partition_in_order() {
        let broker = InMemoryBroker::new(3);
        let m1 = broker.publish("t", "bob", "1".into()).await.unwrap();
        let m2 = broker.publish("t", "bob", "2".into()).await.unwrap();
        assert_eq!(m1.partition, m2.partition);
        assert_eq!(m2.offset, m1.offset + 1);
    }

    #[tokio::test]
    async fn uncommitted_records_are_redelivered() {
        let broker = InMemoryBroker::new(1);
        broker.publish("t", "k", "a".into()).await.unwrap();

        let first = broker.poll("g", "t", &[0], 10).await.unwrap();
        assert_eq!(first.len(), 1);

        // No commit: the same record comes back
        let again = broker.poll("g", "t", &[0], 10).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].payload, "a");

        broker.commit("g", "t", 0, 1).await.unwrap();
        let after = broker.poll("g", "t", &[0], 10).await.unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn groups_track_independent_offsets() {
        let broker = InMemoryBroker::new(1);
        broker.publish("t", "k", "a".into()).await.unwrap();
        broker.commit("g1", "t", 0, 1).await.unwrap();

        assert!(broker.poll("g1", "t", &[0], 10).await.unwrap().is_empty());
        assert_eq!(broker.poll("g2", "t", &[0], 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commits_never_move_backwards() {
        let broker = InMemoryBroker::new(1);
        for i in 0..3 {
            broker.publish("t", "k", i.to_string()).await.unwrap();
        }
        broker.commit("g", "t", 0, 3).await.unwrap();
        broker.commit("g", "t", 0, 1).await.unwrap();
        assert!(broker.poll("g", "t", &[0], 10).await.unwrap().is_empty());
    }

    #[test]
    fn key_hashing_is_stable() {
        let a = InMemoryBroker::new(3);
        let b = InMemoryBroker::new(3);
        assert_eq!(a.partition_for_key("bob"), b.partition_for_key("bob"));
    }
}
