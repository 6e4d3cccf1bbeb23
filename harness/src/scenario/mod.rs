//! Scenario orchestration
//!
//! A scenario is a named sequence of enumerated steps driven through a
//! small state machine. The catalog keeps the acceptance suite's original
//! vocabulary as scenario names.

pub mod catalog;
pub mod orchestrator;
pub mod steps;

pub use catalog::available_scenarios;
pub use orchestrator::{ScenarioOrchestrator, ScenarioOutcome};
pub use steps::{DeviceFixture, Scenario, ScenarioStep};
