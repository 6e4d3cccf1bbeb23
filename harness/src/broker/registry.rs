//! Queue and exchange registry
//!
//! Owns every queue handle for the life of the test process. Declarations
//! are idempotent; [`purge_all`](QueueRegistry::purge_all) leaves every
//! queue verifiably empty, so a previous scenario's messages can never
//! satisfy the next scenario's assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::{HarnessError, HarnessResult};

use super::transport::{ExchangeKind, RoutingPredicate, Transport};
use crate::retry::eventually;

/// Handle to a declared queue. Clones refer to the same broker queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub name: String,
    pub durable: bool,
    pub passive: bool,
}

pub struct QueueRegistry {
    transport: Arc<dyn Transport>,
    queues: Mutex<HashMap<String, QueueHandle>>,
    purge_timeout: Duration,
    poll_interval: Duration,
}

impl QueueRegistry {
    pub fn new(
        transport: Arc<dyn Transport>,
        purge_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            queues: Mutex::new(HashMap::new()),
            purge_timeout,
            poll_interval,
        }
    }

    pub async fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> HarnessResult<()> {
        tracing::debug!(exchange = name, ?kind, "declaring exchange");
        self.transport.declare_exchange(name, kind).await
    }

    /// Create-or-attach; with `passive`, the queue must already exist on
    /// the broker (it belongs to the service under test).
    pub async fn declare_queue(
        &self,
        name: &str,
        durable: bool,
        passive: bool,
    ) -> HarnessResult<QueueHandle> {
        tracing::debug!(queue = name, durable, passive, "declaring queue");
        self.transport.declare_queue(name, durable, passive).await?;
        let handle = QueueHandle {
            name: name.to_string(),
            durable,
            passive,
        };
        self.queues
            .lock()
            .unwrap()
            .insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub async fn bind(
        &self,
        queue: &str,
        exchange: &str,
        predicate: RoutingPredicate,
    ) -> HarnessResult<()> {
        self.transport.bind(queue, exchange, predicate).await
    }

    pub fn lookup(&self, name: &str) -> HarnessResult<QueueHandle> {
        self.queues
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| HarnessError::QueueNotFound {
                name: name.to_string(),
            })
    }

    /// Names of every registered queue, in declaration-independent order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Purge every registered queue, then confirm each one actually
    /// drained. The confirmation pop also consumes stragglers that were in
    /// flight when the purge ran.
    pub async fn purge_all(&self) -> HarnessResult<()> {
        for name in self.names() {
            self.transport.purge(&name).await?;

            let transport = self.transport.clone();
            let queue = name.clone();
            let drained = eventually(
                || {
                    let transport = transport.clone();
                    let queue = queue.clone();
                    async move { matches!(transport.try_pop(&queue).await, Ok(None)) }
                },
                self.purge_timeout,
                self.poll_interval,
            )
            .await;

            if !drained {
                return Err(HarnessError::PurgeTimeout {
                    queue: name,
                    timeout: self.purge_timeout,
                });
            }
            tracing::debug!(queue = %name, "queue drained");
        }
        Ok(())
    }
}
