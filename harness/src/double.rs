//! Scripted double of the credit-offer service
//!
//! The real service is an external collaborator; this double reenacts only
//! its observable contract so the harness can run self-contained against
//! the in-memory broker model: consume registrations, dead-letter garbage,
//! award the Hudl 2 promotion at most once per user while the budget
//! lasts, and emit the credit request, promotions row, email event, and
//! reporting event the scenarios assert on. Real deployments attach the
//! actual service to the registration queue instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use shared::fixtures::{
    EMAIL_SEND_CONTENT_TYPE, PROMOTION_ID, USER_CREDITED_CONTENT_TYPE,
};
use shared::{
    CreditReportedEvent, CreditRequestBody, EmailAttributes, EmailEvent, EmailRecipient,
    HarnessResult, ReportedUser,
};

use crate::bootstrap::{
    AGORA_EXCHANGE, EVENTS_EXCHANGE, REGISTRATION_DLQ, REGISTRATION_QUEUE,
};
use crate::broker::{ExchangeKind, Message, RoutingPredicate, Transport};
use crate::db::{PromotionRow, PromotionsStore};

const AWARD_AMOUNT: f64 = 10.0;
const PROMOTION_LIMIT: f64 = 350_000.0;
const REACT_INTERVAL: Duration = Duration::from_millis(25);

struct DoubleContext {
    transport: Arc<dyn Transport>,
    store: PromotionsStore,
    http: reqwest::Client,
    credit_base_url: String,
    auth_base_url: String,
}

/// Running double; reacts on a spawned task until
/// [`shutdown`](CreditOfferDouble::shutdown).
pub struct CreditOfferDouble {
    reactor: tokio::task::JoinHandle<()>,
}

impl CreditOfferDouble {
    /// Declare the service-owned topology (the registration queue, its
    /// DLQ, and the binding to the events exchange) and start reacting.
    /// Must run before the rig's passive declarations.
    pub async fn start(
        transport: Arc<dyn Transport>,
        store: PromotionsStore,
        credit_base_url: String,
        auth_base_url: String,
    ) -> HarnessResult<Self> {
        transport
            .declare_exchange(EVENTS_EXCHANGE, ExchangeKind::Topic)
            .await?;
        transport
            .declare_queue(REGISTRATION_QUEUE, true, false)
            .await?;
        transport
            .declare_queue(REGISTRATION_DLQ, true, false)
            .await?;
        transport
            .bind(
                REGISTRATION_QUEUE,
                EVENTS_EXCHANGE,
                RoutingPredicate::Key("events.clients.v1.registered".to_string()),
            )
            .await?;

        let ctx = DoubleContext {
            transport,
            store,
            http: reqwest::Client::new(),
            credit_base_url,
            auth_base_url,
        };

        let reactor = tokio::spawn(async move {
            loop {
                match ctx.transport.try_pop(REGISTRATION_QUEUE).await {
                    Ok(Some(message)) => {
                        if let Err(error) = process(&ctx, message).await {
                            tracing::warn!(%error, "credit-offer double failed to process a registration");
                        }
                    }
                    Ok(None) => tokio::time::sleep(REACT_INTERVAL).await,
                    Err(error) => {
                        tracing::warn!(%error, "credit-offer double lost its queue");
                        tokio::time::sleep(REACT_INTERVAL).await;
                    }
                }
            }
        });

        Ok(Self { reactor })
    }

    pub fn shutdown(&self) {
        self.reactor.abort();
    }
}

struct Registration {
    user_id: i64,
    model: String,
    timestamp: Option<String>,
}

async fn process(ctx: &DoubleContext, message: Message) -> HarnessResult<()> {
    let Some(registration) = parse_registration(&message.body) else {
        tracing::debug!("dead-lettering an unprocessable registration event");
        return ctx
            .transport
            .send_to_queue(REGISTRATION_DLQ, message, true)
            .await;
    };

    if registration.model != "Hudl 2" {
        tracing::debug!(model = %registration.model, "device outside the promotion");
        return Ok(());
    }

    let already_awarded = ctx
        .store
        .rows_for_user(registration.user_id)?
        .iter()
        .any(|row| row.promotion_id == PROMOTION_ID);
    if already_awarded {
        tracing::debug!(user_id = registration.user_id, "promotion already awarded");
        return Ok(());
    }

    if ctx.store.total_credited()? + AWARD_AMOUNT > PROMOTION_LIMIT {
        tracing::debug!("promotion budget exhausted");
        return Ok(());
    }

    award(ctx, &registration).await
}

async fn award(ctx: &DoubleContext, registration: &Registration) -> HarnessResult<()> {
    // Authenticate and look the user up, the way the real service does.
    ctx.http
        .post(format!("{}/oauth2/token", ctx.auth_base_url))
        .send()
        .await?
        .error_for_status()?;
    let user: serde_json::Value = ctx
        .http
        .get(format!(
            "{}/admin/users/{}",
            ctx.auth_base_url, registration.user_id
        ))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let username = user["user_username"].as_str().unwrap_or_default().to_string();
    let first_name = user["user_first_name"].as_str().unwrap_or_default().to_string();
    let last_name = user["user_last_name"].as_str().unwrap_or_default().to_string();

    let credit_request = CreditRequestBody {
        amount: "10.00".to_string(),
        currency: "GBP".to_string(),
        reason: "customer".to_string(),
    };
    ctx.http
        .post(format!(
            "{}/admin/users/{}/credit",
            ctx.credit_base_url, registration.user_id
        ))
        .body(serde_json::to_string(&credit_request)?)
        .send()
        .await?
        .error_for_status()?;

    ctx.store.insert(&PromotionRow {
        user_id: registration.user_id,
        promotion_id: PROMOTION_ID.to_string(),
        created_at: Utc::now(),
        credited_amount: AWARD_AMOUNT,
    })?;

    let timestamp = registration
        .timestamp
        .clone()
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    let email = EmailEvent {
        schema: "actions.email.send.v2".to_string(),
        timestamp: timestamp.clone(),
        to: EmailRecipient {
            username: username.clone(),
            id: registration.user_id,
        },
        template_name: PROMOTION_ID.to_string(),
        attributes: EmailAttributes {
            first_name: first_name.clone(),
            last_name: last_name.clone(),
        },
    };
    ctx.transport
        .publish(
            AGORA_EXCHANGE,
            Message::new(serde_json::to_string(&email)?)
                .with_content_type(EMAIL_SEND_CONTENT_TYPE),
            "",
            true,
        )
        .await?;

    let reported = CreditReportedEvent {
        schema: "events.user.credited.v2".to_string(),
        timestamp,
        user: ReportedUser {
            id: registration.user_id,
            username,
            first_name,
            last_name,
        },
        amount: AWARD_AMOUNT,
        currency: "GBP".to_string(),
        reason: PROMOTION_ID.to_string(),
    };
    ctx.transport
        .publish(
            AGORA_EXCHANGE,
            Message::new(serde_json::to_string(&reported)?)
                .with_content_type(USER_CREDITED_CONTENT_TYPE),
            "",
            true,
        )
        .await?;

    tracing::info!(user_id = registration.user_id, "awarded promotional credit");
    Ok(())
}

// Registration schema handling belongs to the real service; tag scraping
// is all the double needs to honor its contract.
fn parse_registration(body: &str) -> Option<Registration> {
    if !body.trim_start().starts_with("<?xml") {
        return None;
    }
    let user_id = extract_tag(body, "userId")?.parse().ok()?;
    let model = extract_tag(body, "model")?;
    let timestamp = extract_tag(body, "timestamp");
    Some(Registration {
        user_id,
        model,
        timestamp,
    })
}

fn extract_tag(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::fixtures;

    #[test]
    fn parses_a_well_formed_registration() {
        let registration = parse_registration(&fixtures::hudl2_registration()).unwrap();
        assert_eq!(registration.user_id, 123);
        assert_eq!(registration.model, "Hudl 2");
        assert_eq!(
            registration.timestamp.as_deref(),
            Some("2013-12-30T19:15:23Z")
        );
    }

    #[test]
    fn rejects_non_xml_and_incomplete_registrations() {
        assert!(parse_registration(&fixtures::invalid_registration()).is_none());
        assert!(parse_registration(&fixtures::missing_model_registration()).is_none());
    }
}
