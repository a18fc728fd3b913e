//! Presence tracking and fan-out.
//!
//! Holds a process-lifetime online table and, on every transition, tells
//! each of the user's room peers with one addressed ONLINE/OFFLINE event.
//! Addressed fan-out keeps presence partitioned per observer instead of
//! flooding one broadcast partition.

use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::entities::ChatRoomRepository;
use crate::shared::error::PipelineError;

use super::chat_producer::ChatProducer;

pub struct PresenceService {
    online: DashMap<String, bool>,
    rooms: Arc<dyn ChatRoomRepository>,
    producer: Arc<ChatProducer>,
}

impl PresenceService {
    pub fn new(rooms: Arc<dyn ChatRoomRepository>, producer: Arc<ChatProducer>) -> Self {
        Self {
            online: DashMap::new(),
            rooms,
            producer,
        }
    }

    /// Record a presence transition and notify every room peer.
    ///
    /// Returns the number of peers notified. A user with no rooms produces
    /// no events.
    pub async fn set_online(&self, user_id: &str, online: bool) -> Result<usize, PipelineError> {
        self.online.insert(user_id.to_string(), online);
        tracing::info!(user = %user_id, online, "Presence transition");

        let rooms = self.rooms.rooms_for_user(user_id).await?;
        let mut notified = 0;
        for room in &rooms {
            if let Some(peer) = room.peer_of(user_id) {
                self.producer.send_presence(user_id, online, Some(peer))?;
                notified += 1;
            }
        }
        Ok(notified)
    }

    /// Current presence flag. Users never seen are offline.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.online.get(user_id).map(|entry| *entry).unwrap_or(false)
    }

    /// Users currently marked online.
    pub fn online_users(&self) -> Vec<String> {
        self.online
            .iter()
            .filter(|entry| *entry.value())
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::{topics, TopicRouter};
    use crate::infrastructure::broker::InMemoryBroker;
    use crate::infrastructure::repositories::InMemoryChatRoomRepository;

    async fn fixture() -> (PresenceService, Arc<InMemoryBroker>) {
        let broker = Arc::new(InMemoryBroker::new(3));
        let rooms = Arc::new(InMemoryChatRoomRepository::new());
        rooms.get_or_create("alice", "bob").await.unwrap();
        rooms.get_or_create("alice", "carol").await.unwrap();
        let producer = Arc::new(ChatProducer::new(broker.clone(), TopicRouter::new()));
        (PresenceService::new(rooms, producer), broker)
    }

    #[tokio::test]
    async fn transition_fans_out_per_peer() {
        let (service, broker) = fixture().await;

        let notified = service.set_online("alice", true).await.unwrap();
        assert_eq!(notified, 2);
        assert!(service.is_online("alice"));

        // One addressed event per peer
        crate::infrastructure::broker::wait_for_depth(&broker, topics::CHAT_STATUS, 2).await;
    }

    #[tokio::test]
    async fn unknown_users_are_offline() {
        let (service, _broker) = fixture().await;
        assert!(!service.is_online("nobody"));
        assert!(service.online_users().is_empty());
    }

    #[tokio::test]
    async fn offline_transition_is_recorded() {
        let (service, _broker) = fixture().await;
        service.set_online("bob", true).await.unwrap();
        service.set_online("bob", false).await.unwrap();
        assert!(!service.is_online("bob"));
        assert!(service.online_users().is_empty());
    }
}
