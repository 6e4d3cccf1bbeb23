//! Bounded-deadline polling consumer
//!
//! Converts "a message will eventually arrive" into a synchronous check:
//! one non-blocking pop per poll interval until a message shows up or the
//! deadline passes. The interval trades assertion latency against broker
//! load; scenario timeouts assume [`DEFAULT_POLL_INTERVAL`], so overrides
//! belong in `HarnessConfig`, not at call sites.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use shared::HarnessResult;

use super::registry::QueueHandle;
use super::transport::{Message, Transport};

/// Default pause between dequeue attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct PollingConsumer {
    transport: Arc<dyn Transport>,
    interval: Duration,
}

impl PollingConsumer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_interval(transport, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(transport: Arc<dyn Transport>, interval: Duration) -> Self {
        Self { transport, interval }
    }

    /// First message observed on the queue, or `None` once the deadline
    /// passes. A zero timeout performs exactly one attempt.
    ///
    /// Two concurrent callers on one queue compete for the same message;
    /// scenarios keep a single consumer per queue to stay deterministic.
    pub async fn pop(
        &self,
        queue: &QueueHandle,
        timeout: Duration,
    ) -> HarnessResult<Option<Message>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.transport.try_pop(&queue.name).await? {
                tracing::debug!(queue = %queue.name, "observed message");
                return Ok(Some(message));
            }
            if Instant::now() >= deadline {
                tracing::debug!(queue = %queue.name, ?timeout, "nothing observed");
                return Ok(None);
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::MemoryTransport;

    fn handle(name: &str) -> QueueHandle {
        QueueHandle {
            name: name.to_string(),
            durable: true,
            passive: false,
        }
    }

    #[tokio::test]
    async fn zero_timeout_pops_without_sleeping() {
        let transport = MemoryTransport::new();
        transport.declare_queue("q", true, false).await.unwrap();
        let consumer =
            PollingConsumer::with_interval(Arc::new(transport), Duration::from_millis(10));

        let start = std::time::Instant::now();
        let observed = consumer.pop(&handle("q"), Duration::ZERO).await.unwrap();
        assert_eq!(observed, None);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn observes_a_message_arriving_mid_wait() {
        let transport = MemoryTransport::new();
        transport.declare_queue("q", true, false).await.unwrap();
        let consumer = PollingConsumer::with_interval(
            Arc::new(transport.clone()),
            Duration::from_millis(10),
        );

        let publisher = transport.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            publisher
                .send_to_queue("q", Message::new("late arrival"), true)
                .await
                .unwrap();
        });

        let observed = consumer
            .pop(&handle("q"), Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(observed.map(|m| m.body), Some("late arrival".to_string()));
    }

    #[tokio::test]
    async fn returns_nothing_once_the_deadline_passes() {
        let transport = MemoryTransport::new();
        transport.declare_queue("q", true, false).await.unwrap();
        let consumer =
            PollingConsumer::with_interval(Arc::new(transport), Duration::from_millis(10));

        let observed = consumer
            .pop(&handle("q"), Duration::from_millis(60))
            .await
            .unwrap();
        assert_eq!(observed, None);
    }

    #[tokio::test]
    async fn pop_returns_the_first_message_only() {
        let transport = MemoryTransport::new();
        transport.declare_queue("q", true, false).await.unwrap();
        for body in ["one", "two"] {
            transport
                .send_to_queue("q", Message::new(body), true)
                .await
                .unwrap();
        }
        let consumer = PollingConsumer::with_interval(
            Arc::new(transport.clone()),
            Duration::from_millis(10),
        );

        let observed = consumer
            .pop(&handle("q"), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(observed.map(|m| m.body), Some("one".to_string()));
        assert_eq!(transport.depth("q"), 1);
    }
}
