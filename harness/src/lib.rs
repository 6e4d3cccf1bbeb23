//! Acceptance harness for the promotion-credit service
//!
//! Verifies an event-driven service end to end: a scenario publishes a
//! device-registration event onto the bus, the service under test reacts
//! asynchronously, and the harness observes the eventually-consistent side
//! effects — queue messages, HTTP credit requests, promotions rows — with
//! bounded waits instead of fixed sleeps.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use harness::{HarnessConfig, MemoryTransport, PromotionsStore, Rig, Transport};
//! use harness::scenario::catalog;
//! use stubs::{AuthServiceStub, CreditServiceStub};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
//! let store = PromotionsStore::open_in_memory()?;
//! let credit_stub = CreditServiceStub::start(0).await?;
//! let auth_stub = AuthServiceStub::start(0).await?;
//!
//! // ... attach the service under test to the registration queue ...
//!
//! let rig = Rig::start(transport, store, credit_stub, auth_stub, HarnessConfig::default()).await?;
//! let mut orchestrator = rig.orchestrator();
//!
//! let scenario = catalog::scenario("hudl2_credit").unwrap();
//! let outcome = orchestrator.run(&scenario).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod broker;
pub mod config;
pub mod db;
pub mod double;
pub mod introspection;
pub mod retry;
pub mod scenario;

// Main interfaces, re-exported at crate root for convenience
pub use bootstrap::{Rig, declare_topology};
pub use broker::{
    Bus, ExchangeKind, MemoryTransport, Message, PollingConsumer, QueueHandle, QueueRegistry,
    RoutingPredicate, Transport,
};
pub use config::{HarnessConfig, HarnessConfigBuilder};
pub use db::{PromotionRow, PromotionsStore};
pub use double::CreditOfferDouble;
pub use introspection::RequestLogClient;
pub use retry::eventually;
pub use scenario::{Scenario, ScenarioOrchestrator, ScenarioOutcome, ScenarioStep};
