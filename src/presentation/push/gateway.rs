//! Per-user push channels.
//!
//! The delivery edge of the pipeline: a connected user holds an unbounded
//! channel receiver, and consumed chat events addressed to them are pushed
//! through it. Offline users are skipped silently; the broker-side record
//! is already committed and history lives in the store.

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::domain::events::ChatEvent;
use crate::infrastructure::metrics;

pub struct PushGateway {
    channels: DashMap<String, mpsc::UnboundedSender<ChatEvent>>,
}

impl Default for PushGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PushGateway {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Register a user's push channel. A reconnect replaces the previous
    /// channel; the old receiver closes.
    pub fn connect(&self, user_id: impl Into<String>) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.insert(user_id.into(), tx);
        metrics::set_push_channels(self.channels.len() as i64);
        rx
    }

    /// Drop a user's push channel.
    pub fn disconnect(&self, user_id: &str) {
        self.channels.remove(user_id);
        metrics::set_push_channels(self.channels.len() as i64);
    }

    /// Deliver an event to a user, dropping it silently when the user is
    /// offline. Returns whether it was delivered.
    pub fn push(&self, user_id: &str, event: ChatEvent) -> bool {
        let delivered = match self.channels.get(user_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        };

        if !delivered {
            // A closed channel means the receiver went away without a
            // clean disconnect
            if self.channels.remove(user_id).is_some() {
                metrics::set_push_channels(self.channels.len() as i64);
                tracing::debug!(user = %user_id, "Removed stale push channel");
            }
        }

        metrics::record_push(delivered);
        delivered
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.channels.contains_key(user_id)
    }

    pub fn connected_count(&self) -> usize {
        self.channels.len()
    }
}
