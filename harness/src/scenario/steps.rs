//! Enumerated scenario vocabulary

use shared::fixtures;

/// Which registration payload a Given step arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFixture {
    Hudl2,
    Hudl1,
    /// Second Hudl 2 registration by the same user, different device id.
    Hudl2Repeat,
    /// Not an XML document at all.
    InvalidFormat,
    /// Well-formed XML missing the mandatory model element.
    MissingModel,
}

impl DeviceFixture {
    pub fn payload(self) -> String {
        match self {
            DeviceFixture::Hudl2 => fixtures::hudl2_registration(),
            DeviceFixture::Hudl1 => fixtures::hudl1_registration(),
            DeviceFixture::Hudl2Repeat => fixtures::repeat_hudl2_registration(),
            DeviceFixture::InvalidFormat => fixtures::invalid_registration(),
            DeviceFixture::MissingModel => fixtures::missing_model_registration(),
        }
    }
}

/// One step of a scenario. Given steps arm state or seed prior state, the
/// When step publishes the armed payload, and each Then step performs one
/// bounded wait against one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStep {
    /// Select the registration payload and its expected outcomes.
    GivenRegistration(DeviceFixture),
    /// Run a full Hudl 2 registration to completion, then purge queues and
    /// clear the log so only the next registration is under observation.
    GivenAlreadyRegistered,
    /// Seed a promotions row exhausting the promotion budget.
    GivenPromotionLimitReached,
    /// Clear the HTTP log and publish the armed payload to the events
    /// exchange. The only externally observable trigger.
    WhenEventPublished,
    /// Exactly one credit request with the expected body, and exactly one
    /// promotions row with the expected promotion id and amount.
    ThenCredited,
    /// The email queue yields the expected send-email event.
    ThenEmailQueued,
    /// The reporting queue yields the expected user-credited event.
    ThenCreditReported,
    /// No credit request was logged within the settle deadline.
    ThenNoCredit,
    /// The email queue stays empty through the settle deadline.
    ThenNoEmail,
    /// The reporting queue stays empty through the settle deadline.
    ThenNotReported,
    /// The dead-letter queue yields the armed payload verbatim.
    ThenDeadLettered,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub steps: Vec<ScenarioStep>,
}
