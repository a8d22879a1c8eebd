//! Retry logic.
//!
//! # Responsibilities
//! - Decide after each failed attempt: retry after a backoff, give up, or
//!   surface the error as not worth retrying
//! - Wait the jittered exponential backoff between attempts
//!
//! # Design Decisions
//! - `PolicyChain` drives the attempt loop; every attempt is admitted by the
//!   breaker, rate limiter and bulkhead on its own
//! - The backoff wait is only entered with no admission resource held
//! - Backoff waits are plain `tokio::time::sleep`; dropping the call future
//!   stops further attempts

use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::MetricsSink;
use crate::resilience::backoff::Backoff;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    Exhausted,
    /// Error is not worth retrying.
    Fatal,
}

#[derive(Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    metrics: Arc<MetricsSink>,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig, metrics: Arc<MetricsSink>) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Backoff::from_config(config),
            metrics,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide after `attempts_made` attempts, the last of which failed.
    pub fn decide(&self, attempts_made: u32, transient: bool) -> RetryDecision {
        if !transient {
            RetryDecision::Fatal
        } else if attempts_made >= self.max_attempts {
            RetryDecision::Exhausted
        } else {
            RetryDecision::RetryAfter(self.backoff.delay(attempts_made))
        }
    }

    /// Wait `delay` before attempt `next_attempt`.
    pub async fn pause(&self, next_attempt: u32, delay: Duration) {
        tracing::debug!(attempt = next_attempt, delay = ?delay, "Retrying protected call");
        self.metrics.record_retry_attempt();
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::RETRY_ATTEMPTS;
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            &RetryConfig { max_attempts, base_delay_ms: 100, max_delay_ms: 1000 },
            Arc::new(MetricsSink::new()),
        )
    }

    #[test]
    fn test_decide() {
        let p = policy(3);
        assert!(matches!(p.decide(1, true), RetryDecision::RetryAfter(_)));
        assert!(matches!(p.decide(2, true), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(3, true), RetryDecision::Exhausted);
        assert_eq!(p.decide(1, false), RetryDecision::Fatal);
    }

    #[test]
    fn test_single_attempt_policy_never_retries() {
        let p = policy(0);
        assert_eq!(p.max_attempts(), 1);
        assert_eq!(p.decide(1, true), RetryDecision::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_and_counts() {
        let p = policy(3);
        let RetryDecision::RetryAfter(delay) = p.decide(2, true) else {
            panic!("expected a retry");
        };
        assert!(delay >= Duration::from_millis(200) && delay < Duration::from_millis(220));

        let start = Instant::now();
        p.pause(3, delay).await;
        assert_eq!(start.elapsed(), delay);
        assert_eq!(p.metrics.counter_total(RETRY_ATTEMPTS), 1);
    }
}
