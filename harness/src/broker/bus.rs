//! Publish primitives
//!
//! Fire-and-forget from the harness's perspective: no acknowledgement is
//! awaited, so delivery confidence comes from later polling the destination
//! queues, never from the publish itself.

use std::sync::Arc;

use shared::HarnessResult;

use super::transport::{Message, Transport};

#[derive(Clone)]
pub struct Bus {
    transport: Arc<dyn Transport>,
}

impl Bus {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Route a message through an exchange under a routing key.
    pub async fn publish(
        &self,
        exchange: &str,
        message: Message,
        routing_key: &str,
        persistent: bool,
    ) -> HarnessResult<()> {
        tracing::debug!(exchange, routing_key, "publishing message");
        self.transport
            .publish(exchange, message, routing_key, persistent)
            .await
    }

    /// Default-exchange publish straight onto a named queue.
    pub async fn send_to_queue(
        &self,
        queue: &str,
        message: Message,
        persistent: bool,
    ) -> HarnessResult<()> {
        tracing::debug!(queue, "sending message to queue");
        self.transport.send_to_queue(queue, message, persistent).await
    }
}
