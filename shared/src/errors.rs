//! Error taxonomy for the acceptance harness
//!
//! "Nothing observed" from a bounded wait is deliberately NOT an error: the
//! polling primitives return `Option`/`bool` and the call site decides
//! whether absence fails the scenario.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// Bad or missing exchange/queue declaration.
    #[error("topology error: {message}")]
    Topology { message: String },

    /// A queue name the registry has never seen.
    #[error("queue not found: {name}")]
    QueueNotFound { name: String },

    /// A purged queue kept yielding messages past its drain deadline.
    /// Signals test pollution from a previous run or a stuck consumer.
    #[error("queue '{queue}' did not drain within {timeout:?}")]
    PurgeTimeout { queue: String, timeout: Duration },

    /// An observed value differs from the expected fixture.
    #[error("assertion mismatch on {subject}: expected {expected}, observed {observed}")]
    AssertionMismatch {
        subject: String,
        expected: String,
        observed: String,
    },

    /// A scenario step applied in a state that cannot accept it, or a
    /// malformed response on an internal surface.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Bring-up failure. Always fatal to the run.
    #[error("startup failed: {message}")]
    Startup { message: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
