//! Harness bring-up
//!
//! Builds the whole rig: stub services with bounded readiness checks, the
//! promotions store, the broker topology, and the wiring the scenario
//! orchestrator runs over. Bring-up failures are fatal; there is no point
//! running scenarios against a half-up rig.

use std::sync::Arc;

use stubs::{AuthServiceStub, CreditServiceStub};

use shared::fixtures::{EMAIL_SEND_CONTENT_TYPE, USER_CREDITED_CONTENT_TYPE};
use shared::{HarnessError, HarnessResult};

use crate::broker::{Bus, ExchangeKind, PollingConsumer, QueueRegistry, RoutingPredicate, Transport};
use crate::config::HarnessConfig;
use crate::db::PromotionsStore;
use crate::introspection::RequestLogClient;
use crate::retry::eventually;
use crate::scenario::ScenarioOrchestrator;

pub const EVENTS_EXCHANGE: &str = "Events";
pub const AGORA_EXCHANGE: &str = "Agora";
pub const REPORTING_QUEUE: &str = "Reporting.UserCredit.Event";
pub const EMAIL_QUEUE: &str = "Exact.Target.Sender.Queue";
pub const REGISTRATION_QUEUE: &str = "Credit.Offer.DeviceRegistration";
pub const REGISTRATION_DLQ: &str = "Credit.Offer.DeviceRegistration.DLQ";

/// Everything a scenario run needs, constructed once per process and
/// passed by reference. Queues are purged between scenarios, never
/// destroyed; stubs stop at [`shutdown`](Rig::shutdown).
pub struct Rig {
    pub registry: Arc<QueueRegistry>,
    pub bus: Bus,
    pub consumer: PollingConsumer,
    pub log_client: RequestLogClient,
    pub store: PromotionsStore,
    pub config: HarnessConfig,
    credit_stub: CreditServiceStub,
    auth_stub: AuthServiceStub,
}

impl Rig {
    /// Bring the rig up over an already-prepared transport and store.
    ///
    /// The stubs are started by the caller (the service double needs their
    /// addresses before the rig exists); this takes ownership, confirms
    /// both answer within the readiness deadline, and declares the
    /// harness-side topology. The registration queue and its DLQ belong to
    /// the service under test and are declared passively: if they are
    /// missing, bring-up fails rather than masking a dead service.
    pub async fn start(
        transport: Arc<dyn Transport>,
        store: PromotionsStore,
        credit_stub: CreditServiceStub,
        auth_stub: AuthServiceStub,
        config: HarnessConfig,
    ) -> HarnessResult<Self> {
        let log_client = RequestLogClient::new(&credit_stub.base_url());

        tracing::info!("waiting for stub services to answer");
        let probe = log_client.clone();
        let ready = eventually(
            || {
                let client = probe.clone();
                async move { client.is_ready().await }
            },
            config.readiness_timeout,
            config.poll_interval,
        )
        .await;
        if !ready {
            return Err(HarnessError::Startup {
                message: format!(
                    "credit service stub at {} never became ready",
                    credit_stub.base_url()
                ),
            });
        }

        let auth_probe_url = format!("{}/admin/users/123", auth_stub.base_url());
        let http = reqwest::Client::new();
        let ready = eventually(
            || {
                let http = http.clone();
                let url = auth_probe_url.clone();
                async move {
                    http.get(&url)
                        .send()
                        .await
                        .map(|r| r.status().is_success())
                        .unwrap_or(false)
                }
            },
            config.readiness_timeout,
            config.poll_interval,
        )
        .await;
        if !ready {
            return Err(HarnessError::Startup {
                message: format!(
                    "auth service stub at {} never became ready",
                    auth_stub.base_url()
                ),
            });
        }
        tracing::info!("stub services ready");

        let registry = Arc::new(QueueRegistry::new(
            transport.clone(),
            config.purge_timeout,
            config.poll_interval,
        ));
        declare_topology(&registry).await?;
        tracing::info!("broker topology declared");

        let bus = Bus::new(transport.clone());
        let consumer = PollingConsumer::with_interval(transport, config.poll_interval);

        Ok(Self {
            registry,
            bus,
            consumer,
            log_client,
            store,
            config,
            credit_stub,
            auth_stub,
        })
    }

    pub fn credit_stub_url(&self) -> String {
        self.credit_stub.base_url()
    }

    pub fn auth_stub_url(&self) -> String {
        self.auth_stub.base_url()
    }

    /// Build an orchestrator over this rig's components.
    pub fn orchestrator(&self) -> ScenarioOrchestrator {
        ScenarioOrchestrator::new(
            self.registry.clone(),
            self.bus.clone(),
            self.consumer.clone(),
            self.log_client.clone(),
            self.store.clone(),
            self.config.clone(),
        )
    }

    pub fn shutdown(&self) {
        self.credit_stub.shutdown();
        self.auth_stub.shutdown();
    }
}

/// Declare the exchanges, queues, and bindings the scenarios observe.
pub async fn declare_topology(registry: &QueueRegistry) -> HarnessResult<()> {
    registry
        .declare_exchange(AGORA_EXCHANGE, ExchangeKind::Headers)
        .await?;
    registry
        .declare_exchange(EVENTS_EXCHANGE, ExchangeKind::Topic)
        .await?;

    registry.declare_queue(REPORTING_QUEUE, true, false).await?;
    registry.declare_queue(EMAIL_QUEUE, true, false).await?;
    registry.declare_queue(REGISTRATION_DLQ, true, true).await?;
    registry.declare_queue(REGISTRATION_QUEUE, true, true).await?;

    registry
        .bind(
            EMAIL_QUEUE,
            AGORA_EXCHANGE,
            RoutingPredicate::Header {
                name: "content-type".to_string(),
                value: EMAIL_SEND_CONTENT_TYPE.to_string(),
            },
        )
        .await?;
    registry
        .bind(
            REPORTING_QUEUE,
            AGORA_EXCHANGE,
            RoutingPredicate::Header {
                name: "content-type".to_string(),
                value: USER_CREDITED_CONTENT_TYPE.to_string(),
            },
        )
        .await?;
    Ok(())
}
