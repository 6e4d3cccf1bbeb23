//! Bounded-deadline retry primitive
//!
//! The one polling loop behind every eventual-consistency check in the
//! harness: queue drains, stub readiness, settle-before-assert waits.
//! Fixed-interval polling, no backoff, no jitter.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Retry `probe` until it returns true or `timeout` elapses.
///
/// Returns `false` on deadline rather than erroring, so the call site
/// decides whether absence is a failure. A zero timeout probes exactly
/// once.
pub async fn eventually<F, Fut>(mut probe: F, timeout: Duration, interval: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn returns_true_immediately_when_probe_holds() {
        let attempts = AtomicUsize::new(0);
        let result = eventually(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { true }
            },
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .await;
        assert!(result);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_probe_turns_true() {
        let attempts = AtomicUsize::new(0);
        let result = eventually(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { n >= 2 }
            },
            Duration::from_secs(1),
            Duration::from_millis(5),
        )
        .await;
        assert!(result);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_false_once_the_deadline_passes() {
        let start = std::time::Instant::now();
        let result = eventually(
            || async { false },
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await;
        assert!(!result);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn zero_timeout_probes_exactly_once() {
        let attempts = AtomicUsize::new(0);
        let result = eventually(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { false }
            },
            Duration::ZERO,
            Duration::from_millis(10),
        )
        .await;
        assert!(!result);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
