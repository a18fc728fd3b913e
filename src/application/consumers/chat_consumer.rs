//! Chat record handler.
//!
//! Pushes consumed chat events to the addressed user's channel. Runs under
//! `FailurePolicy::BestEffort`: messages are persisted on the send path,
//! so a failed push costs a live update, not data.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::events::ChatEvent;
use crate::infrastructure::broker::Record;
use crate::presentation::push::PushGateway;
use crate::shared::error::PipelineError;

use super::worker::RecordHandler;

pub struct ChatPushHandler {
    gateway: Arc<PushGateway>,
}

impl ChatPushHandler {
    pub fn new(gateway: Arc<PushGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl RecordHandler for ChatPushHandler {
    async fn handle(&self, record: &Record) -> Result<(), PipelineError> {
        let event: ChatEvent = record.decode()?;

        let Some(receiver) = event.receiver_id.clone() else {
            tracing::debug!(record_id = %record.id, kind = %event.kind(), "Unaddressed event, nothing to push");
            return Ok(());
        };

        let delivered = self.gateway.push(&receiver, event);
        tracing::debug!(
            record_id = %record.id,
            receiver = %receiver,
            delivered,
            "Chat event push attempted"
        );
        Ok(())
    }
}
