//! Bounded exponential backoff for the status-check paths
//!
//! Only the scheduler-driven clients (reconciliation, timeout recovery)
//! retry; the online payment request path never does, keeping user-facing
//! latency bounded by a single deadline.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based), capped at
    /// `max_delay`, with up to 20% random jitter added to de-synchronize
    /// sweeping workers.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = base_ms.min(self.max_delay.as_millis() as f64);
        let jitter = rand::thread_rng().gen_range(0.0..=0.2);
        Duration::from_millis((capped * (1.0 + jitter)) as u64)
    }

    /// Deterministic variant used by the unit tests.
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis(base_ms.min(self.max_delay.as_millis() as f64) as u64)
    }
}

/// Retry `operation` until it succeeds or the policy is exhausted,
/// returning the last error.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "retrying");
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_curve_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1_000),
            multiplier: 2.0,
        };
        assert_eq!(policy.base_delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.base_delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.base_delay_for_attempt(2), Duration::from_millis(400));
        // Capped.
        assert_eq!(policy.base_delay_for_attempt(5), Duration::from_millis(1_000));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 0..4 {
            let base = policy.base_delay_for_attempt(attempt).as_millis();
            let jittered = policy.delay_for_attempt(attempt).as_millis();
            assert!(jittered >= base);
            assert!(jittered <= base + base / 5 + 1);
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 1.0,
        };
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(&policy, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("not yet")
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            multiplier: 1.0,
        };
        let calls = AtomicU32::new(0);

        let result: Result<i32, &str> = retry_with_backoff(&policy, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("still down")
        })
        .await;

        assert_eq!(result, Err("still down"));
        // 1 initial + 2 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
