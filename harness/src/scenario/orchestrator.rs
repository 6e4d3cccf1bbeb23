//! Scenario state machine
//!
//! `Idle -> Armed -> Published -> Verified | Failed`, one scenario at a
//! time. The pre-scenario [`reset`](ScenarioOrchestrator::reset) purges
//! every queue, clears the HTTP log, and deletes the promotions rows the
//! scenarios own, so no side effect of a previous run can satisfy (or
//! poison) the next one.

use std::sync::Arc;

use shared::fixtures::{
    self, FIXTURE_USER_ID, PROMOTION_ID, REGISTRATION_ROUTING_KEY,
};
use shared::{
    CreditReportedEvent, CreditRequestBody, EmailEvent, HarnessError, HarnessResult,
};

use crate::bootstrap::{
    EMAIL_QUEUE, EVENTS_EXCHANGE, REGISTRATION_DLQ, REPORTING_QUEUE,
};
use crate::broker::{Bus, Message, PollingConsumer, QueueRegistry};
use crate::config::HarnessConfig;
use crate::db::{PromotionRow, PromotionsStore};
use crate::introspection::RequestLogClient;
use crate::retry::eventually;

use super::steps::{DeviceFixture, Scenario, ScenarioStep};

/// User the limit scenario seeds prior credit against.
pub const SEEDED_USER_ID: i64 = 124;

/// Amount that exhausts the promotion budget in one row.
const LIMIT_SEED_AMOUNT: f64 = 350_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Armed,
    Published,
    Verified,
    Failed,
}

/// Terminal result of one scenario run. Scenario-local; the next run
/// starts from a fresh reset either way.
#[derive(Debug)]
pub enum ScenarioOutcome {
    Verified,
    Failed {
        step: ScenarioStep,
        error: HarnessError,
    },
}

struct ArmedFixtures {
    payload: String,
    expected_email: EmailEvent,
    expected_reporting: CreditReportedEvent,
    expected_credit: CreditRequestBody,
}

pub struct ScenarioOrchestrator {
    registry: Arc<QueueRegistry>,
    bus: Bus,
    consumer: PollingConsumer,
    log_client: RequestLogClient,
    store: PromotionsStore,
    config: HarnessConfig,
    state: State,
    armed: Option<ArmedFixtures>,
}

impl ScenarioOrchestrator {
    pub fn new(
        registry: Arc<QueueRegistry>,
        bus: Bus,
        consumer: PollingConsumer,
        log_client: RequestLogClient,
        store: PromotionsStore,
        config: HarnessConfig,
    ) -> Self {
        Self {
            registry,
            bus,
            consumer,
            log_client,
            store,
            config,
            state: State::Idle,
            armed: None,
        }
    }

    /// Run one scenario to a terminal state. Assertion failures land in
    /// the returned outcome; isolation-reset failures (notably purge
    /// timeouts) are hard errors so they cannot masquerade as scenario
    /// results.
    pub async fn run(&mut self, scenario: &Scenario) -> HarnessResult<ScenarioOutcome> {
        let run_id = uuid::Uuid::new_v4();
        tracing::info!(scenario = scenario.name, %run_id, "running scenario");

        self.reset().await?;

        for step in &scenario.steps {
            if let Err(error) = self.apply(step).await {
                self.state = State::Failed;
                tracing::error!(
                    scenario = scenario.name,
                    ?step,
                    %error,
                    "scenario failed"
                );
                return Ok(ScenarioOutcome::Failed { step: *step, error });
            }
        }

        self.state = State::Verified;
        tracing::info!(scenario = scenario.name, "scenario verified");
        Ok(ScenarioOutcome::Verified)
    }

    /// Pre-scenario isolation: purge every queue (bounded), clear the HTTP
    /// log, delete the promotions rows the scenarios own, rewind to Idle.
    pub async fn reset(&mut self) -> HarnessResult<()> {
        self.registry.purge_all().await?;
        self.log_client.clear().await?;
        self.store.delete_for_user(FIXTURE_USER_ID)?;
        self.store.delete_for_user(SEEDED_USER_ID)?;
        self.state = State::Idle;
        self.armed = None;
        Ok(())
    }

    async fn apply(&mut self, step: &ScenarioStep) -> HarnessResult<()> {
        match step {
            ScenarioStep::GivenRegistration(fixture) => self.given_registration(*fixture),
            ScenarioStep::GivenAlreadyRegistered => self.given_already_registered().await,
            ScenarioStep::GivenPromotionLimitReached => self.given_limit_reached(),
            ScenarioStep::WhenEventPublished => self.when_event_published().await,
            ScenarioStep::ThenCredited => self.then_credited().await,
            ScenarioStep::ThenEmailQueued => self.then_email_queued().await,
            ScenarioStep::ThenCreditReported => self.then_credit_reported().await,
            ScenarioStep::ThenNoCredit => self.then_no_credit().await,
            ScenarioStep::ThenNoEmail => self.then_queue_stays_empty(EMAIL_QUEUE).await,
            ScenarioStep::ThenNotReported => self.then_queue_stays_empty(REPORTING_QUEUE).await,
            ScenarioStep::ThenDeadLettered => self.then_dead_lettered().await,
        }
    }

    fn given_registration(&mut self, fixture: DeviceFixture) -> HarnessResult<()> {
        self.require_state(&[State::Idle, State::Armed], "GivenRegistration")?;
        self.armed = Some(ArmedFixtures {
            payload: fixture.payload(),
            expected_email: fixtures::expected_email_event(),
            expected_reporting: fixtures::expected_credit_reported_event(),
            expected_credit: fixtures::expected_credit_request(),
        });
        self.state = State::Armed;
        Ok(())
    }

    /// Publish a Hudl 2 registration, wait for the service to finish
    /// reacting, then wipe its traces so the next registration is the one
    /// under observation. The award row stays in the database.
    async fn given_already_registered(&mut self) -> HarnessResult<()> {
        self.require_state(&[State::Idle], "GivenAlreadyRegistered")?;

        self.log_client.clear().await?;
        self.bus
            .publish(
                EVENTS_EXCHANGE,
                Message::new(fixtures::hudl2_registration()),
                REGISTRATION_ROUTING_KEY,
                true,
            )
            .await?;

        let log_client = self.log_client.clone();
        let credited = eventually(
            || {
                let client = log_client.clone();
                async move { client.num_requests().await.map(|n| n >= 1).unwrap_or(false) }
            },
            self.config.settle_timeout,
            self.config.poll_interval,
        )
        .await;
        if !credited {
            return Err(HarnessError::AssertionMismatch {
                subject: "prior registration credit request".to_string(),
                expected: "at least 1".to_string(),
                observed: "0 within deadline".to_string(),
            });
        }

        // Drain the outbound events before purging, so messages published
        // moments after the credit request cannot outlive the purge.
        for queue in [EMAIL_QUEUE, REPORTING_QUEUE] {
            let handle = self.registry.lookup(queue)?;
            self.consumer.pop(&handle, self.config.pop_timeout).await?;
        }

        self.registry.purge_all().await?;
        self.log_client.clear().await?;
        self.state = State::Idle;
        self.armed = None;
        Ok(())
    }

    fn given_limit_reached(&mut self) -> HarnessResult<()> {
        self.require_state(&[State::Idle, State::Armed], "GivenPromotionLimitReached")?;
        self.store.insert(&PromotionRow {
            user_id: SEEDED_USER_ID,
            promotion_id: PROMOTION_ID.to_string(),
            created_at: chrono::Utc::now(),
            credited_amount: LIMIT_SEED_AMOUNT,
        })?;
        Ok(())
    }

    async fn when_event_published(&mut self) -> HarnessResult<()> {
        self.require_state(&[State::Armed], "WhenEventPublished")?;
        let payload = self.armed()?.payload.clone();

        self.log_client.clear().await?;
        self.bus
            .publish(
                EVENTS_EXCHANGE,
                Message::new(payload),
                REGISTRATION_ROUTING_KEY,
                true,
            )
            .await?;
        self.state = State::Published;
        Ok(())
    }

    async fn then_credited(&mut self) -> HarnessResult<()> {
        self.require_state(&[State::Published], "ThenCredited")?;

        let log_client = self.log_client.clone();
        let requested = eventually(
            || {
                let client = log_client.clone();
                async move { client.num_requests().await.map(|n| n >= 1).unwrap_or(false) }
            },
            self.config.settle_timeout,
            self.config.poll_interval,
        )
        .await;
        if !requested {
            return Err(HarnessError::AssertionMismatch {
                subject: "credit request count".to_string(),
                expected: "1".to_string(),
                observed: "0 within deadline".to_string(),
            });
        }

        let expected = serde_json::to_value(&self.armed()?.expected_credit)?;
        let observed_body = self.last_request_body().await?;
        let observed: serde_json::Value =
            serde_json::from_str(&observed_body).map_err(|_| HarnessError::AssertionMismatch {
                subject: "credit request body".to_string(),
                expected: expected.to_string(),
                observed: observed_body.clone(),
            })?;
        ensure_eq("credit request body", &expected, &observed)?;

        let count = self.log_client.num_requests().await?;
        ensure_eq("credit request count", &1usize, &count)?;

        // The award row lands moments after the credit request does, so
        // the database is polled too rather than read once.
        let store = self.store.clone();
        let recorded = eventually(
            || {
                let store = store.clone();
                async move {
                    store
                        .rows_for_user(FIXTURE_USER_ID)
                        .map(|rows| rows.len() == 1)
                        .unwrap_or(false)
                }
            },
            self.config.settle_timeout,
            self.config.poll_interval,
        )
        .await;
        let rows = self.store.rows_for_user(FIXTURE_USER_ID)?;
        if !recorded {
            return Err(HarnessError::AssertionMismatch {
                subject: "promotions row count".to_string(),
                expected: "1".to_string(),
                observed: rows.len().to_string(),
            });
        }
        ensure_eq(
            "promotion id",
            &PROMOTION_ID.to_string(),
            &rows[0].promotion_id,
        )?;
        ensure_eq("credited amount", &10.0f64, &rows[0].credited_amount)?;
        Ok(())
    }

    async fn then_email_queued(&mut self) -> HarnessResult<()> {
        self.require_state(&[State::Published], "ThenEmailQueued")?;

        let handle = self.registry.lookup(EMAIL_QUEUE)?;
        let message = self
            .consumer
            .pop(&handle, self.config.pop_timeout)
            .await?
            .ok_or_else(|| nothing_observed("email queue", "one send-email event"))?;

        let observed: EmailEvent = serde_json::from_str(&message.body)?;
        let expected = &self.armed()?.expected_email;
        ensure_eq("email $schema", &expected.schema, &observed.schema)?;
        ensure_eq("email to.username", &expected.to.username, &observed.to.username)?;
        ensure_eq("email to.id", &expected.to.id, &observed.to.id)?;
        ensure_eq(
            "email templateName",
            &expected.template_name,
            &observed.template_name,
        )?;
        ensure_eq("email attributes", &expected.attributes, &observed.attributes)?;
        Ok(())
    }

    async fn then_credit_reported(&mut self) -> HarnessResult<()> {
        self.require_state(&[State::Published], "ThenCreditReported")?;

        let handle = self.registry.lookup(REPORTING_QUEUE)?;
        let message = self
            .consumer
            .pop(&handle, self.config.pop_timeout)
            .await?
            .ok_or_else(|| nothing_observed("reporting queue", "one user-credited event"))?;

        let observed: CreditReportedEvent = serde_json::from_str(&message.body)?;
        let expected = &self.armed()?.expected_reporting;
        ensure_eq("reporting $schema", &expected.schema, &observed.schema)?;
        ensure_eq("reporting user.id", &expected.user.id, &observed.user.id)?;
        ensure_eq(
            "reporting user.firstName",
            &expected.user.first_name,
            &observed.user.first_name,
        )?;
        ensure_eq(
            "reporting user.lastName",
            &expected.user.last_name,
            &observed.user.last_name,
        )?;
        ensure_eq("reporting amount", &expected.amount, &observed.amount)?;
        ensure_eq("reporting currency", &expected.currency, &observed.currency)?;
        ensure_eq("reporting reason", &expected.reason, &observed.reason)?;
        Ok(())
    }

    /// Give the service the full settle deadline to misbehave; pass only
    /// if no credit request ever shows up.
    async fn then_no_credit(&mut self) -> HarnessResult<()> {
        self.require_state(&[State::Published], "ThenNoCredit")?;

        let log_client = self.log_client.clone();
        let appeared = eventually(
            || {
                let client = log_client.clone();
                async move { client.num_requests().await.map(|n| n > 0).unwrap_or(false) }
            },
            self.config.settle_timeout,
            self.config.poll_interval,
        )
        .await;
        if appeared {
            let count = self.log_client.num_requests().await?;
            return Err(HarnessError::AssertionMismatch {
                subject: "credit request count".to_string(),
                expected: "0".to_string(),
                observed: count.to_string(),
            });
        }
        Ok(())
    }

    /// Emptiness is asserted by popping with the settle deadline: any
    /// message observed is the failure payload, reported rather than lost.
    async fn then_queue_stays_empty(&mut self, queue: &str) -> HarnessResult<()> {
        self.require_state(&[State::Published], "ThenQueueStaysEmpty")?;

        let handle = self.registry.lookup(queue)?;
        match self.consumer.pop(&handle, self.config.settle_timeout).await? {
            Some(message) => Err(HarnessError::AssertionMismatch {
                subject: format!("{queue} backlog"),
                expected: "empty".to_string(),
                observed: message.body,
            }),
            None => Ok(()),
        }
    }

    async fn then_dead_lettered(&mut self) -> HarnessResult<()> {
        self.require_state(&[State::Published], "ThenDeadLettered")?;

        let handle = self.registry.lookup(REGISTRATION_DLQ)?;
        let message = self
            .consumer
            .pop(&handle, self.config.pop_timeout)
            .await?
            .ok_or_else(|| nothing_observed("dead-letter queue", "the original payload"))?;

        ensure_eq(
            "dead-lettered payload",
            &self.armed()?.payload,
            &message.body,
        )
    }

    async fn last_request_body(&self) -> HarnessResult<String> {
        self.log_client
            .last_request()
            .await?
            .ok_or_else(|| nothing_observed("request log", "a credit request body"))
    }

    fn armed(&self) -> HarnessResult<&ArmedFixtures> {
        self.armed.as_ref().ok_or_else(|| HarnessError::Protocol {
            message: "no fixture armed".to_string(),
        })
    }

    fn require_state(&self, allowed: &[State], step: &str) -> HarnessResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(HarnessError::Protocol {
                message: format!("step {step} not valid in state {:?}", self.state),
            })
        }
    }
}

fn ensure_eq<T: PartialEq + std::fmt::Debug>(
    subject: &str,
    expected: &T,
    observed: &T,
) -> HarnessResult<()> {
    if expected == observed {
        Ok(())
    } else {
        Err(HarnessError::AssertionMismatch {
            subject: subject.to_string(),
            expected: format!("{expected:?}"),
            observed: format!("{observed:?}"),
        })
    }
}

fn nothing_observed(subject: &str, expected: &str) -> HarnessError {
    HarnessError::AssertionMismatch {
        subject: subject.to_string(),
        expected: expected.to_string(),
        observed: "nothing observed".to_string(),
    }
}
