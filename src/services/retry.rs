//! Bounded retry with a fixed delay.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Total calls allowed, never below one.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    #[must_use]
    pub fn into_backoff(self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times((self.attempts() - 1) as usize)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` calls have failed.
///
/// Every error is retried the same way; there is no delay after the final
/// attempt. The last error is returned on exhaustion. A policy of zero
/// attempts still runs `op` once.
pub async fn retry_fixed<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let attempt = AtomicU32::new(0);

    let counted = || {
        let current = attempt.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(label, attempt = current, attempts, "Attempting operation");
        op()
    };

    let result = counted
        .retry(policy.into_backoff())
        .sleep(tokio::time::sleep)
        .notify(|e: &E, delay: Duration| {
            warn!(
                label,
                attempt = attempt.load(Ordering::SeqCst),
                attempts,
                error = %e,
                "Attempt failed, retrying in {:?}",
                delay
            );
        })
        .await;

    if let Err(e) = &result {
        warn!(
            label,
            attempt = attempt.load(Ordering::SeqCst),
            attempts,
            error = %e,
            "Giving up after final attempt"
        );
    }
    result
}
