//! Broker boundary.
//!
//! The pipeline talks to a partitioned, append-only event log through the
//! `EventBroker` trait. Records are keyed; a key always hashes to the same
//! partition, so ordering is guaranteed per key within a partition and
//! nowhere else. Offsets are committed manually per consumer group;
//! anything polled but not committed is redelivered (at-least-once).

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::error::PipelineError;

pub use memory::{wait_for_depth, InMemoryBroker};

/// Broker acknowledgment of a published record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
}

impl std::fmt::Display for RecordMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}@{}", self.topic, self.partition, self.offset)
    }
}

/// A record as seen by a consumer.
#[derive(Debug, Clone)]
pub struct Record {
    /// Trace ID for log correlation
    pub id: Uuid,
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: String,
    /// Serialized event payload (JSON)
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Deserialize the payload into an event type.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, PipelineError> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Partitioned event log with manually committed consumer-group offsets.
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Append a record; resolves once the broker has durably queued it.
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: String,
    ) -> Result<RecordMetadata, PipelineError>;

    /// Fetch up to `max_records` uncommitted records for a group from the
    /// given partitions of a topic.
    async fn poll(
        &self,
        group: &str,
        topic: &str,
        partitions: &[u32],
        max_records: usize,
    ) -> Result<Vec<Record>, PipelineError>;

    /// Commit the group's offset on a partition: `offset` is the next
    /// offset the group will read. Commits never move backwards.
    async fn commit(
        &self,
        group: &str,
        topic: &str,
        partition: u32,
        offset: u64,
    ) -> Result<(), PipelineError>;

    /// Number of partitions per topic.
    fn partitions(&self) -> u32;

    /// Partition a key routes to. Stable across processes.
    fn partition_for_key(&self, key: &str) -> u32;
}
