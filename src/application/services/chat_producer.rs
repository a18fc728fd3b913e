//! Chat event producer.
//!
//! Publishes chat events to their kind-specific topics, keyed on the
//! receiver so each peer observes a consistent per-conversation order.

use std::sync::Arc;

use crate::domain::entities::ChatMessage;
use crate::domain::events::ChatEvent;
use crate::domain::routing::TopicRouter;
use crate::infrastructure::broker::EventBroker;
use crate::shared::error::PipelineError;

use super::dispatch::{Dispatcher, SendHandle};

pub struct ChatProducer {
    dispatcher: Dispatcher,
    router: TopicRouter,
}

impl ChatProducer {
    pub fn new(broker: Arc<dyn EventBroker>, router: TopicRouter) -> Self {
        Self {
            dispatcher: Dispatcher::new(broker),
            router,
        }
    }

    /// Send any chat event to the topic its kind maps to. Sends with the
    /// same key are published in call order.
    pub fn send(&self, event: &ChatEvent) -> Result<SendHandle, PipelineError> {
        let route = self.router.route_chat(event);
        let payload = serde_json::to_string(event)?;
        Ok(self.dispatcher.dispatch(route, payload))
    }

    /// Wrap a persisted message and publish it as a MESSAGE event.
    pub fn send_message_event(&self, message: ChatMessage) -> Result<SendHandle, PipelineError> {
        self.send(&ChatEvent::message_event(message))
    }

    /// Tell the peer how far the reader's cursor has advanced.
    pub fn send_read_receipt(
        &self,
        reader_id: &str,
        peer_id: &str,
        room_id: &str,
        last_read_message_id: i64,
    ) -> Result<SendHandle, PipelineError> {
        self.send(&ChatEvent::read_event(
            reader_id,
            peer_id,
            room_id,
            last_read_message_id,
        ))
    }

    /// Publish a typing indicator for a room peer.
    pub fn send_typing(
        &self,
        sender_id: &str,
        receiver_id: &str,
        room_id: &str,
        typing: bool,
    ) -> Result<SendHandle, PipelineError> {
        self.send(&ChatEvent::typing_event(sender_id, receiver_id, room_id, typing))
    }

    /// Publish a presence event. Pass an addressee to target one peer,
    /// or `None` for the broadcast partition.
    pub fn send_presence(
        &self,
        user_id: &str,
        online: bool,
        addressee: Option<&str>,
    ) -> Result<SendHandle, PipelineError> {
        let mut event = ChatEvent::presence_event(user_id, online);
        if let Some(peer) = addressee {
            event = event.addressed_to(peer);
        }
        self.send(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::ChatPayload;
    use crate::domain::routing::topics;
    use crate::infrastructure::broker::{wait_for_depth, EventBroker, InMemoryBroker};

    #[tokio::test]
    async fn message_event_lands_on_chat_message_topic() {
        let broker = Arc::new(InMemoryBroker::new(3));
        let producer = ChatProducer::new(broker.clone(), TopicRouter::new());

        let metadata = producer
            .send_message_event(ChatMessage::text("alice", "bob", "hello"))
            .unwrap()
            .resolve()
            .await
            .unwrap();

        assert_eq!(metadata.topic, topics::CHAT_MESSAGE);
        assert_eq!(broker.depth(topics::CHAT_MESSAGE), 1);
    }

    #[tokio::test]
    async fn fire_and_forget_sends_stay_in_order() {
        let broker = Arc::new(InMemoryBroker::new(3));
        let producer = ChatProducer::new(broker.clone(), TopicRouter::new());

        // Handles dropped on purpose: nothing serializes these but the
        // producer's own partition lane
        for text in ["first", "second", "third"] {
            drop(
                producer
                    .send_message_event(ChatMessage::text("alice", "bob", text))
                    .unwrap(),
            );
        }

        wait_for_depth(&broker, topics::CHAT_MESSAGE, 3).await;

        let partition = broker.partition_for_key("bob");
        let records = broker
            .poll("g", topics::CHAT_MESSAGE, &[partition], 10)
            .await
            .unwrap();
        let contents: Vec<String> = records
            .iter()
            .map(|r| {
                let event: ChatEvent = r.decode().unwrap();
                match event.payload {
                    ChatPayload::Message(m) => m.content,
                    other => panic!("expected message payload, got {:?}", other),
                }
            })
            .collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn read_receipt_keys_on_peer() {
        let broker = Arc::new(InMemoryBroker::new(3));
        let producer = ChatProducer::new(broker.clone(), TopicRouter::new());

        producer
            .send_read_receipt("bob", "alice", "alice_bob", 99)
            .unwrap()
            .resolve()
            .await
            .unwrap();

        assert_eq!(broker.depth(topics::CHAT_READ), 1);
    }
}
