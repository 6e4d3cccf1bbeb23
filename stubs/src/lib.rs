//! Stub HTTP collaborators for the acceptance harness
//!
//! The service under test talks to two downstream HTTP services: the admin
//! account-credit service and the auth service. Both are stubbed here with
//! canned documents. The credit stub additionally records every inbound
//! request body into a [`RequestLog`] so the harness can assert on HTTP
//! side effects it cannot subscribe to directly.
//!
//! Both stubs bind a local TCP listener (port 0 picks a free port) and
//! serve on a spawned task; the returned handle carries the bound address.

pub mod auth_service;
pub mod credit_service;
pub mod request_log;

pub use auth_service::AuthServiceStub;
pub use credit_service::CreditServiceStub;
pub use request_log::RequestLog;
