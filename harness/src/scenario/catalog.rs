//! Named scenario catalog
//!
//! The acceptance suite's vocabulary, as data: each entry is the step list
//! the original scenario text described.

use super::steps::{DeviceFixture, Scenario, ScenarioStep};

/// Scenario names in suggested run order.
pub fn available_scenarios() -> Vec<&'static str> {
    vec![
        "hudl2_credit",
        "hudl1_no_credit",
        "repeat_registration",
        "limit_reached",
        "malformed_event",
        "missing_fields",
    ]
}

/// Look a scenario up by name.
pub fn scenario(name: &str) -> Option<Scenario> {
    use DeviceFixture::*;
    use ScenarioStep::*;

    let scenario = match name {
        // A user registers a Hudl 2 and receives the promotional credit.
        "hudl2_credit" => Scenario {
            name: "hudl2_credit",
            steps: vec![
                GivenRegistration(Hudl2),
                WhenEventPublished,
                ThenCredited,
                ThenEmailQueued,
                ThenCreditReported,
            ],
        },
        // First-generation Hudls are outside the promotion.
        "hudl1_no_credit" => Scenario {
            name: "hudl1_no_credit",
            steps: vec![
                GivenRegistration(Hudl1),
                WhenEventPublished,
                ThenNoCredit,
                ThenNoEmail,
                ThenNotReported,
            ],
        },
        // Registering a second Hudl 2 does not credit the user again.
        "repeat_registration" => Scenario {
            name: "repeat_registration",
            steps: vec![
                GivenAlreadyRegistered,
                GivenRegistration(Hudl2Repeat),
                WhenEventPublished,
                ThenNoCredit,
                ThenNoEmail,
            ],
        },
        // Once the promotion budget is spent, nobody else gets credit.
        "limit_reached" => Scenario {
            name: "limit_reached",
            steps: vec![
                GivenPromotionLimitReached,
                GivenRegistration(Hudl2),
                WhenEventPublished,
                ThenNoCredit,
                ThenNoEmail,
            ],
        },
        // Garbage on the events exchange is preserved for later processing.
        "malformed_event" => Scenario {
            name: "malformed_event",
            steps: vec![
                GivenRegistration(InvalidFormat),
                WhenEventPublished,
                ThenDeadLettered,
                ThenNotReported,
                ThenNoEmail,
            ],
        },
        // A registration missing mandatory information is dead-lettered.
        "missing_fields" => Scenario {
            name: "missing_fields",
            steps: vec![
                GivenRegistration(MissingModel),
                WhenEventPublished,
                ThenDeadLettered,
                ThenNoCredit,
            ],
        },
        _ => return None,
    };
    Some(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for name in available_scenarios() {
            let scenario = scenario(name).unwrap();
            assert_eq!(scenario.name, name);
            assert!(!scenario.steps.is_empty());
        }
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert!(scenario("hudl3_credit").is_none());
    }

    #[test]
    fn every_scenario_publishes_before_asserting() {
        use ScenarioStep::*;
        for name in available_scenarios() {
            let steps = scenario(name).unwrap().steps;
            let publish = steps.iter().position(|s| *s == WhenEventPublished).unwrap();
            let first_then = steps
                .iter()
                .position(|s| {
                    matches!(
                        s,
                        ThenCredited
                            | ThenEmailQueued
                            | ThenCreditReported
                            | ThenNoCredit
                            | ThenNoEmail
                            | ThenNotReported
                            | ThenDeadLettered
                    )
                })
                .unwrap();
            assert!(publish < first_then, "{name} asserts before publishing");
        }
    }
}
