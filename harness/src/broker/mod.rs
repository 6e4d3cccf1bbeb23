//! Client-side model of the topic-routed message bus
//!
//! The harness needs exactly the routing and consumption semantics its
//! scenarios observe: exchanges with topic/headers/fanout routing, durable
//! queues with bindings, non-blocking pops, and purges. [`Transport`] is the
//! seam to the already-running broker; [`MemoryTransport`] models those
//! semantics in-process.

pub mod bus;
pub mod consumer;
pub mod memory;
pub mod registry;
pub mod transport;

pub use bus::Bus;
pub use consumer::{DEFAULT_POLL_INTERVAL, PollingConsumer};
pub use memory::MemoryTransport;
pub use registry::{QueueHandle, QueueRegistry};
pub use transport::{ExchangeKind, Message, RoutingPredicate, Transport};
