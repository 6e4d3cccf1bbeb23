//! In-memory broker model
//!
//! Implements the client-visible routing semantics of a topic-routed
//! broker: topic exchanges match dot-separated binding keys with `*`/`#`
//! wildcards, headers exchanges match on header equality, fanout copies to
//! every bound queue. No persistence and no delivery guarantees; a publish
//! that routes nowhere drops the message, as on a real broker.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use shared::{HarnessError, HarnessResult};

use super::transport::{ExchangeKind, Message, RoutingPredicate, Transport};

#[derive(Debug, Clone, PartialEq)]
struct BindingEntry {
    queue: String,
    exchange: String,
    predicate: RoutingPredicate,
}

#[derive(Debug)]
struct QueueState {
    durable: bool,
    backlog: VecDeque<Message>,
}

#[derive(Debug, Default)]
struct BrokerState {
    exchanges: HashMap<String, ExchangeKind>,
    queues: HashMap<String, QueueState>,
    bindings: Vec<BindingEntry>,
}

/// Shared in-memory broker; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently sitting on a queue.
    pub fn depth(&self, queue: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.queues.get(queue).map_or(0, |q| q.backlog.len())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.exchanges.get(name) {
            Some(existing) if *existing != kind => Err(HarnessError::Topology {
                message: format!(
                    "exchange '{name}' already declared as {existing:?}, not {kind:?}"
                ),
            }),
            Some(_) => Ok(()),
            None => {
                state.exchanges.insert(name.to_string(), kind);
                Ok(())
            }
        }
    }

    async fn declare_queue(&self, name: &str, durable: bool, passive: bool) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.queues.get(name) {
            Some(existing) if existing.durable != durable => Err(HarnessError::Topology {
                message: format!(
                    "queue '{name}' already declared with durable={}",
                    existing.durable
                ),
            }),
            Some(_) => Ok(()),
            None if passive => Err(HarnessError::Topology {
                message: format!("passive declare of missing queue '{name}'"),
            }),
            None => {
                state.queues.insert(
                    name.to_string(),
                    QueueState {
                        durable,
                        backlog: VecDeque::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn bind(
        &self,
        queue: &str,
        exchange: &str,
        predicate: RoutingPredicate,
    ) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.exchanges.contains_key(exchange) {
            return Err(HarnessError::Topology {
                message: format!("bind against undeclared exchange '{exchange}'"),
            });
        }
        if !state.queues.contains_key(queue) {
            return Err(HarnessError::QueueNotFound {
                name: queue.to_string(),
            });
        }
        let entry = BindingEntry {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            predicate,
        };
        if !state.bindings.contains(&entry) {
            state.bindings.push(entry);
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        message: Message,
        routing_key: &str,
        _persistent: bool,
    ) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        let Some(kind) = state.exchanges.get(exchange).copied() else {
            return Err(HarnessError::Topology {
                message: format!("publish to undeclared exchange '{exchange}'"),
            });
        };

        let targets: Vec<String> = state
            .bindings
            .iter()
            .filter(|binding| {
                binding.exchange == exchange
                    && predicate_matches(kind, &binding.predicate, routing_key, &message)
            })
            .map(|binding| binding.queue.clone())
            .collect();

        for queue in targets {
            if let Some(queue_state) = state.queues.get_mut(&queue) {
                queue_state.backlog.push_back(message.clone());
            }
        }
        Ok(())
    }

    async fn send_to_queue(
        &self,
        queue: &str,
        message: Message,
        _persistent: bool,
    ) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        let queue_state =
            state
                .queues
                .get_mut(queue)
                .ok_or_else(|| HarnessError::QueueNotFound {
                    name: queue.to_string(),
                })?;
        queue_state.backlog.push_back(message);
        Ok(())
    }

    async fn try_pop(&self, queue: &str) -> HarnessResult<Option<Message>> {
        let mut state = self.state.lock().unwrap();
        let queue_state =
            state
                .queues
                .get_mut(queue)
                .ok_or_else(|| HarnessError::QueueNotFound {
                    name: queue.to_string(),
                })?;
        Ok(queue_state.backlog.pop_front())
    }

    async fn purge(&self, queue: &str) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        let queue_state =
            state
                .queues
                .get_mut(queue)
                .ok_or_else(|| HarnessError::QueueNotFound {
                    name: queue.to_string(),
                })?;
        queue_state.backlog.clear();
        Ok(())
    }
}

fn predicate_matches(
    kind: ExchangeKind,
    predicate: &RoutingPredicate,
    routing_key: &str,
    message: &Message,
) -> bool {
    match (kind, predicate) {
        (ExchangeKind::Fanout, _) => true,
        (_, RoutingPredicate::Any) => true,
        (ExchangeKind::Topic, RoutingPredicate::Key(pattern)) => {
            topic_matches(pattern, routing_key)
        }
        (ExchangeKind::Headers, RoutingPredicate::Header { name, value }) => message
            .headers
            .get(name)
            .is_some_and(|observed| observed == value),
        _ => false,
    }
}

fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    fn matches(pattern: &[&str], key: &[&str]) -> bool {
        match pattern.split_first() {
            None => key.is_empty(),
            Some((&"#", rest)) => (0..=key.len()).any(|skip| matches(rest, &key[skip..])),
            Some((&"*", rest)) => key
                .split_first()
                .is_some_and(|(_, key_rest)| matches(rest, key_rest)),
            Some((word, rest)) => key
                .split_first()
                .is_some_and(|(head, key_rest)| word == head && matches(rest, key_rest)),
        }
    }

    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches(&pattern, &key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::fixtures::{EMAIL_SEND_CONTENT_TYPE, USER_CREDITED_CONTENT_TYPE};

    fn header_binding(value: &str) -> RoutingPredicate {
        RoutingPredicate::Header {
            name: "content-type".to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn topic_patterns_match_amqp_wildcards() {
        assert!(topic_matches("events.clients.v1.registered", "events.clients.v1.registered"));
        assert!(topic_matches("events.clients.*.registered", "events.clients.v1.registered"));
        assert!(topic_matches("events.#", "events.clients.v1.registered"));
        assert!(topic_matches("#", "events.clients.v1.registered"));
        assert!(topic_matches("events.#.registered", "events.registered"));
        assert!(!topic_matches("events.clients.*", "events.clients.v1.registered"));
        assert!(!topic_matches("events.orders.#", "events.clients.v1.registered"));
        assert!(!topic_matches("*", "events.clients"));
    }

    #[tokio::test]
    async fn headers_exchange_routes_by_content_type() {
        let transport = MemoryTransport::new();
        transport
            .declare_exchange("Agora", ExchangeKind::Headers)
            .await
            .unwrap();
        transport.declare_queue("email", true, false).await.unwrap();
        transport
            .declare_queue("reporting", true, false)
            .await
            .unwrap();
        transport
            .bind("email", "Agora", header_binding(EMAIL_SEND_CONTENT_TYPE))
            .await
            .unwrap();
        transport
            .bind("reporting", "Agora", header_binding(USER_CREDITED_CONTENT_TYPE))
            .await
            .unwrap();

        let email = Message::new("send-email").with_content_type(EMAIL_SEND_CONTENT_TYPE);
        transport.publish("Agora", email, "", true).await.unwrap();

        assert_eq!(transport.depth("email"), 1);
        assert_eq!(transport.depth("reporting"), 0);

        let credited = Message::new("credited").with_content_type(USER_CREDITED_CONTENT_TYPE);
        transport.publish("Agora", credited, "", true).await.unwrap();

        assert_eq!(transport.depth("email"), 1);
        assert_eq!(transport.depth("reporting"), 1);
    }

    #[tokio::test]
    async fn topic_exchange_routes_by_binding_key() {
        let transport = MemoryTransport::new();
        transport
            .declare_exchange("Events", ExchangeKind::Topic)
            .await
            .unwrap();
        transport
            .declare_queue("registrations", true, false)
            .await
            .unwrap();
        transport
            .declare_queue("orders", true, false)
            .await
            .unwrap();
        transport
            .bind(
                "registrations",
                "Events",
                RoutingPredicate::Key("events.clients.v1.registered".to_string()),
            )
            .await
            .unwrap();
        transport
            .bind(
                "orders",
                "Events",
                RoutingPredicate::Key("events.orders.#".to_string()),
            )
            .await
            .unwrap();

        transport
            .publish(
                "Events",
                Message::new("payload"),
                "events.clients.v1.registered",
                true,
            )
            .await
            .unwrap();

        assert_eq!(transport.depth("registrations"), 1);
        assert_eq!(transport.depth("orders"), 0);
    }

    #[tokio::test]
    async fn fanout_exchange_copies_to_every_bound_queue() {
        let transport = MemoryTransport::new();
        transport
            .declare_exchange("broadcast", ExchangeKind::Fanout)
            .await
            .unwrap();
        for queue in ["a", "b"] {
            transport.declare_queue(queue, false, false).await.unwrap();
            transport
                .bind(queue, "broadcast", RoutingPredicate::Any)
                .await
                .unwrap();
        }

        transport
            .publish("broadcast", Message::new("hello"), "ignored", false)
            .await
            .unwrap();

        assert_eq!(transport.depth("a"), 1);
        assert_eq!(transport.depth("b"), 1);
    }

    #[tokio::test]
    async fn redeclaring_an_exchange_with_a_different_kind_fails() {
        let transport = MemoryTransport::new();
        transport
            .declare_exchange("Events", ExchangeKind::Topic)
            .await
            .unwrap();
        transport
            .declare_exchange("Events", ExchangeKind::Topic)
            .await
            .unwrap();

        let error = transport
            .declare_exchange("Events", ExchangeKind::Fanout)
            .await
            .unwrap_err();
        assert!(matches!(error, HarnessError::Topology { .. }));
    }

    #[tokio::test]
    async fn passive_declare_requires_the_queue_to_exist() {
        let transport = MemoryTransport::new();
        let error = transport
            .declare_queue("preexisting", true, true)
            .await
            .unwrap_err();
        assert!(matches!(error, HarnessError::Topology { .. }));

        transport
            .declare_queue("preexisting", true, false)
            .await
            .unwrap();
        transport
            .declare_queue("preexisting", true, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn publish_to_undeclared_exchange_fails() {
        let transport = MemoryTransport::new();
        let error = transport
            .publish("ghost", Message::new("payload"), "key", true)
            .await
            .unwrap_err();
        assert!(matches!(error, HarnessError::Topology { .. }));
    }

    #[tokio::test]
    async fn pops_are_fifo_and_purge_drops_the_backlog() {
        let transport = MemoryTransport::new();
        transport.declare_queue("q", true, false).await.unwrap();
        transport
            .send_to_queue("q", Message::new("first"), true)
            .await
            .unwrap();
        transport
            .send_to_queue("q", Message::new("second"), true)
            .await
            .unwrap();

        let popped = transport.try_pop("q").await.unwrap().unwrap();
        assert_eq!(popped.body, "first");

        transport.purge("q").await.unwrap();
        assert_eq!(transport.try_pop("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_queue_operations_fail_with_not_found() {
        let transport = MemoryTransport::new();
        let error = transport.try_pop("missing").await.unwrap_err();
        assert!(matches!(error, HarnessError::QueueNotFound { .. }));
    }
}
