//! Circuit breaker for outbound gateway calls
//!
//! Closed: calls pass, consecutive failures are counted. Open: calls are
//! short-circuited until `open_for` elapses. HalfOpen: probe calls pass;
//! enough successes close the breaker, one failure reopens it.
//!
//! The adapter reports declines as data, so the breaker exposes
//! `try_acquire` / `record_*` instead of wrapping a closure: only
//! transport-level failures (timeouts, 5xx, connection errors) count
//! against the breaker, a well-formed business decline counts as success.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// How long to stay open before probing.
    pub open_for: Duration,
    /// Successful probes required to close again.
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    /// Whether a call may go out right now. An expired open window flips
    /// the breaker to HalfOpen and admits the probe.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let expired = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.open_for);
                if expired {
                    tracing::info!("circuit breaker OPEN -> HALF_OPEN");
                    inner.state = BreakerState::HalfOpen;
                    inner.success_count = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => inner.failure_count = 0,
            BreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    tracing::info!("circuit breaker HALF_OPEN -> CLOSED");
                    inner.state = BreakerState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = inner.failure_count,
                        "circuit breaker CLOSED -> OPEN"
                    );
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            BreakerState::HalfOpen => {
                tracing::warn!("circuit breaker HALF_OPEN -> OPEN (probe failed)");
                inner.state = BreakerState::Open;
                inner.failure_count = 1;
                inner.success_count = 0;
                inner.opened_at = Some(Instant::now());
            }
            BreakerState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failures: u32, open_for_ms: u64, successes: u32) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: failures,
            open_for: Duration::from_millis(open_for_ms),
            success_threshold: successes,
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let b = breaker(3, 1000, 1);
        for _ in 0..2 {
            b.record_failure();
        }
        assert_eq!(b.state(), BreakerState::Closed);
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);
        assert!(!b.try_acquire());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let b = breaker(2, 1000, 1);
        b.record_failure();
        b.record_success();
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_after_window() {
        let b = breaker(1, 0, 1);
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);
        // Zero window: next acquire probes immediately.
        assert!(b.try_acquire());
        assert_eq!(b.state(), BreakerState::HalfOpen);
        b.record_success();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let b = breaker(1, 0, 2);
        b.record_failure();
        assert!(b.try_acquire());
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);
    }

    #[test]
    fn test_close_needs_success_threshold() {
        let b = breaker(1, 0, 2);
        b.record_failure();
        assert!(b.try_acquire());
        b.record_success();
        assert_eq!(b.state(), BreakerState::HalfOpen);
        b.record_success();
        assert_eq!(b.state(), BreakerState::Closed);
    }
}
