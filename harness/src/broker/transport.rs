//! Transport seam between the harness and the broker
//!
//! Connection and channel lifecycle belong to the implementation; the
//! harness only issues declarations, publishes, and non-blocking pops.

use std::collections::HashMap;

use async_trait::async_trait;

use shared::HarnessResult;

/// Routing discipline of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Topic,
    Headers,
    Fanout,
}

/// Rule deciding whether a published message reaches a bound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingPredicate {
    /// Topic binding key. `*` matches exactly one dot-separated word, `#`
    /// matches zero or more.
    Key(String),
    /// Headers-exchange equality match on a single header.
    Header { name: String, value: String },
    /// Always true; what fanout bindings carry.
    Any,
}

/// A bus message: opaque body plus the headers routing may inspect.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Attach the `content-type` header, the field headers exchanges
    /// route on here.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.headers
            .insert("content-type".to_string(), content_type.to_string());
        self
    }
}

/// Broker operations the harness relies on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Idempotent; fails with a topology error if `name` already exists
    /// with a different kind.
    async fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> HarnessResult<()>;

    /// Create-or-attach. With `passive`, fails when the queue does not
    /// already exist on the broker.
    async fn declare_queue(&self, name: &str, durable: bool, passive: bool) -> HarnessResult<()>;

    /// Attach a routing predicate; identical repeat bindings are a no-op.
    async fn bind(
        &self,
        queue: &str,
        exchange: &str,
        predicate: RoutingPredicate,
    ) -> HarnessResult<()>;

    /// Fire-and-forget publish through an exchange; no delivery
    /// acknowledgement is awaited.
    async fn publish(
        &self,
        exchange: &str,
        message: Message,
        routing_key: &str,
        persistent: bool,
    ) -> HarnessResult<()>;

    /// Default-exchange publish straight onto a named queue.
    async fn send_to_queue(
        &self,
        queue: &str,
        message: Message,
        persistent: bool,
    ) -> HarnessResult<()>;

    /// Single non-blocking dequeue attempt.
    async fn try_pop(&self, queue: &str) -> HarnessResult<Option<Message>>;

    /// Drop a queue's entire backlog.
    async fn purge(&self, queue: &str) -> HarnessResult<()>;
}
