//! Fixture payloads and expected-outcome documents
//!
//! Input payloads are XML device-registration documents published verbatim
//! onto the events exchange; the expected outcomes are the JSON documents
//! the service under test emits on its outbound channels. Field names here
//! match the wire format exactly (`$schema`, `templateName`, `firstName`),
//! so these types double as the parse target for observed messages.

use serde::{Deserialize, Serialize};

/// Content type that routes send-email events through the headers exchange.
pub const EMAIL_SEND_CONTENT_TYPE: &str =
    "application/vnd.blinkbox.books.events.email.send.v2+json";

/// Content type that routes user-credited events through the headers exchange.
pub const USER_CREDITED_CONTENT_TYPE: &str =
    "application/vnd.blinkbox.books.events.user.credited.v2+json";

/// Routing key device-registration events are published under.
pub const REGISTRATION_ROUTING_KEY: &str = "events.clients.v1.registered";

/// User id every registration fixture belongs to.
pub const FIXTURE_USER_ID: i64 = 123;

/// Promotion the Hudl 2 registration qualifies for.
pub const PROMOTION_ID: &str = "account_credit_hudl2";

fn registration_document(model: &str, device_id: u64, timestamp: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<registered xmlns="http://schemas.blinkboxbooks.com/events/clients/v1"
            xmlns:r="http://schemas.blinkboxbooks.com/messaging/routing/v1"
            xmlns:v="http://schemas.blinkboxbooks.com/messaging/versioning"
            r:originator="zuul" v:version="1.0">
  <userId>{FIXTURE_USER_ID}</userId>
  <timestamp>{timestamp}</timestamp>
  <client>
    <id>{device_id}</id>
    <name>My New Phone</name>
    <brand>Hudl</brand>
    <model>{model}</model>
    <os>android</os>
  </client>
</registered>
"#
    )
}

/// Well-formed Hudl 2 registration for user 123.
pub fn hudl2_registration() -> String {
    registration_document("Hudl 2", 19384, "2013-12-30T19:15:23Z")
}

/// First-generation Hudl registration; outside the promotion.
pub fn hudl1_registration() -> String {
    registration_document("Hudl", 19384, "2013-12-30T19:15:23Z")
}

/// A second Hudl 2 registration by the same user on a different device.
pub fn repeat_hudl2_registration() -> String {
    registration_document("Hudl 2", 8888, "2013-12-30T20:15:23Z")
}

/// Not a registration document at all.
pub fn invalid_registration() -> String {
    r#"{"totally" : "invalid"}"#.to_string()
}

/// Well-formed XML with the mandatory model element missing.
pub fn missing_model_registration() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<registered xmlns="http://schemas.blinkboxbooks.com/events/clients/v1"
            xmlns:r="http://schemas.blinkboxbooks.com/messaging/routing/v1"
            xmlns:v="http://schemas.blinkboxbooks.com/messaging/versioning"
            r:originator="zuul" v:version="1.0">
  <userId>{FIXTURE_USER_ID}</userId>
  <timestamp>2013-12-30T19:15:23Z</timestamp>
  <client>
    <id>19384</id>
    <name>My New Phone</name>
    <brand>Hudl</brand>
    <os>android</os>
  </client>
</registered>
"#
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecipient {
    pub username: String,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAttributes {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
}

/// Send-email event observed on `Exact.Target.Sender.Queue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailEvent {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub timestamp: String,
    pub to: EmailRecipient,
    #[serde(rename = "templateName")]
    pub template_name: String,
    pub attributes: EmailAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedUser {
    pub id: i64,
    pub username: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
}

/// User-credited event observed on `Reporting.UserCredit.Event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditReportedEvent {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub timestamp: String,
    pub user: ReportedUser,
    pub amount: f64,
    pub currency: String,
    pub reason: String,
}

/// Body the service under test POSTs to the admin credit endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRequestBody {
    pub amount: String,
    pub currency: String,
    pub reason: String,
}

/// The email event a successful Hudl 2 registration must produce.
pub fn expected_email_event() -> EmailEvent {
    EmailEvent {
        schema: "actions.email.send.v2".to_string(),
        timestamp: "2013-12-30T19:15:23Z".to_string(),
        to: EmailRecipient {
            username: "acceptance-test@blinkbox.com".to_string(),
            id: FIXTURE_USER_ID,
        },
        template_name: PROMOTION_ID.to_string(),
        attributes: EmailAttributes {
            first_name: "acceptance".to_string(),
            last_name: "test".to_string(),
        },
    }
}

/// The reporting event a successful Hudl 2 registration must produce.
pub fn expected_credit_reported_event() -> CreditReportedEvent {
    CreditReportedEvent {
        schema: "events.user.credited.v2".to_string(),
        timestamp: "2013-12-30T19:15:23Z".to_string(),
        user: ReportedUser {
            id: FIXTURE_USER_ID,
            username: "acceptance-test@blinkbox.com".to_string(),
            first_name: "acceptance".to_string(),
            last_name: "test".to_string(),
        },
        amount: 10.0,
        currency: "GBP".to_string(),
        reason: PROMOTION_ID.to_string(),
    }
}

/// The credit request a successful Hudl 2 registration must log.
pub fn expected_credit_request() -> CreditRequestBody {
    CreditRequestBody {
        amount: "10.00".to_string(),
        currency: "GBP".to_string(),
        reason: "customer".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_event_serializes_with_wire_field_names() {
        let json = serde_json::to_value(expected_email_event()).unwrap();
        assert_eq!(json["$schema"], "actions.email.send.v2");
        assert_eq!(json["templateName"], "account_credit_hudl2");
        assert_eq!(json["attributes"]["firstName"], "acceptance");
        assert_eq!(json["to"]["id"], 123);
    }

    #[test]
    fn reported_event_serializes_with_wire_field_names() {
        let json = serde_json::to_value(expected_credit_reported_event()).unwrap();
        assert_eq!(json["$schema"], "events.user.credited.v2");
        assert_eq!(json["user"]["firstName"], "acceptance");
        assert_eq!(json["amount"], 10.0);
    }

    #[test]
    fn registration_fixtures_differ_where_it_matters() {
        assert!(hudl2_registration().contains("<model>Hudl 2</model>"));
        assert!(hudl1_registration().contains("<model>Hudl</model>"));
        assert!(repeat_hudl2_registration().contains("<id>8888</id>"));
        assert!(!missing_model_registration().contains("<model>"));
        assert!(!invalid_registration().contains("<?xml"));
    }
}
