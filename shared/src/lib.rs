//! Shared types for the promotion-credit acceptance harness
//!
//! Contains only what every member crate needs: the error taxonomy, the
//! fixture payloads with their expected-outcome documents, and the tracing
//! bootstrap. Component-internal types stay in their respective crates.

pub mod errors;
pub mod fixtures;
pub mod logging;

pub use errors::{HarnessError, HarnessResult};
pub use fixtures::{
    CreditReportedEvent, CreditRequestBody, EmailAttributes, EmailEvent, EmailRecipient,
    ReportedUser,
};
