//! Harness configuration
//!
//! Every timing assumption lives here rather than at call sites: the
//! polling interval behind pops and probes, the per-assertion pop deadline,
//! the settle deadline for out-of-band checks, and the purge-drain and
//! bring-up deadlines. Scenario expectations assume the defaults below.

use std::time::Duration;

use crate::broker::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Pause between polling attempts, for pops and probes alike.
    pub poll_interval: Duration,
    /// Deadline for a message to show up on a queue during a Then step.
    pub pop_timeout: Duration,
    /// Deadline for the service under test to settle before checking side
    /// effects on a channel the harness cannot subscribe to (HTTP log,
    /// database). Absence assertions wait this long before passing.
    pub settle_timeout: Duration,
    /// Deadline for a purged queue to read empty.
    pub purge_timeout: Duration,
    /// Deadline for the stub services to answer readiness probes.
    pub readiness_timeout: Duration,
    /// Bind port for the credit stub; 0 picks a free port.
    pub credit_stub_port: u16,
    /// Bind port for the auth stub; 0 picks a free port.
    pub auth_stub_port: u16,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            pop_timeout: Duration::from_secs(2),
            settle_timeout: Duration::from_secs(2),
            purge_timeout: Duration::from_secs(1),
            readiness_timeout: Duration::from_secs(2),
            credit_stub_port: 9141,
            auth_stub_port: 9393,
        }
    }
}

impl HarnessConfig {
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::new()
    }
}

pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn pop_timeout(mut self, timeout: Duration) -> Self {
        self.config.pop_timeout = timeout;
        self
    }

    pub fn settle_timeout(mut self, timeout: Duration) -> Self {
        self.config.settle_timeout = timeout;
        self
    }

    pub fn purge_timeout(mut self, timeout: Duration) -> Self {
        self.config.purge_timeout = timeout;
        self
    }

    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.config.readiness_timeout = timeout;
        self
    }

    pub fn credit_stub_port(mut self, port: u16) -> Self {
        self.config.credit_stub_port = port;
        self
    }

    pub fn auth_stub_port(mut self, port: u16) -> Self {
        self.config.auth_stub_port = port;
        self
    }

    pub fn build(self) -> HarnessConfig {
        self.config
    }
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
