//! Fixed-order composition of the resilience policies.
//!
//! ```text
//! attempt 1: circuit breaker → rate limiter → bulkhead → operation
//!            (slot, token and breaker admission released)
//!            retry decision → backoff wait
//! attempt 2: circuit breaker → rate limiter → bulkhead → operation
//! ...
//! ```
//!
//! Every attempt is admitted on its own: it takes a token, occupies a slot
//! only while the operation runs, and the breaker records its outcome. An
//! admission rejection ends the call; it is never retried.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::ResilienceConfig;
use crate::observability::MetricsSink;
use crate::resilience::circuit_breaker::CallResult;
use crate::resilience::retries::RetryDecision;
use crate::resilience::{
    Bulkhead, CircuitBreaker, PolicyError, RateLimiter, RetryPolicy, Transient,
};

/// Why a single attempt did not produce a value.
enum AttemptError<E> {
    /// Turned away by the breaker, limiter or bulkhead.
    Rejected(PolicyError<E>),
    /// The operation ran and failed.
    Failed(E),
}

#[derive(Debug)]
pub struct PolicyChain {
    breaker: CircuitBreaker,
    limiter: RateLimiter,
    bulkhead: Bulkhead,
    retry: RetryPolicy,
    metrics: Arc<MetricsSink>,
    invocations: AtomicU64,
}

impl PolicyChain {
    pub fn new(config: &ResilienceConfig, metrics: Arc<MetricsSink>) -> Self {
        Self {
            breaker: CircuitBreaker::new(&config.circuit_breaker, metrics.clone()),
            limiter: RateLimiter::new(&config.rate_limiter),
            bulkhead: Bulkhead::new(&config.bulkhead),
            retry: RetryPolicy::new(&config.retry, metrics.clone()),
            metrics,
            invocations: AtomicU64::new(0),
        }
    }

    /// Run `op` through every policy, retrying transient failures.
    pub async fn execute<T, E, F, Fut>(&self, mut op: F) -> Result<T, PolicyError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + fmt::Display,
    {
        self.invocations.fetch_add(1, Ordering::Relaxed);

        let mut attempts = 0;
        loop {
            attempts += 1;
            let err = match self.attempt(&mut op).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Rejected(rejection)) => return Err(rejection),
                Err(AttemptError::Failed(err)) => err,
            };

            match self.retry.decide(attempts, err.is_transient()) {
                RetryDecision::Fatal => return Err(PolicyError::Operation(err)),
                RetryDecision::Exhausted => {
                    tracing::debug!(attempts, error = %err, "Retries exhausted");
                    return Err(PolicyError::RetryExhausted { attempts, last: err });
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::debug!(attempts, error = %err, "Protected call attempt failed");
                    self.retry.pause(attempts + 1, delay).await;
                }
            }
        }
    }

    /// One pass through breaker, limiter and bulkhead into the operation.
    ///
    /// Every admission resource is a local guard, released on return.
    async fn attempt<T, E, F, Fut>(&self, op: &mut F) -> Result<T, AttemptError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(permit) = self.breaker.try_acquire() else {
            tracing::debug!("Circuit open, rejecting call");
            self.metrics.record_rejection("circuit_breaker");
            return Err(AttemptError::Rejected(PolicyError::CircuitOpen));
        };

        if !self.limiter.try_acquire() {
            tracing::debug!("Rate limit exceeded, rejecting call");
            self.metrics.record_rejection("rate_limiter");
            permit.record(CallResult::Abandoned);
            return Err(AttemptError::Rejected(PolicyError::RateLimited));
        }

        let Some(_slot) = self.bulkhead.acquire().await else {
            tracing::debug!(
                max_concurrent = self.bulkhead.state().max_concurrent,
                "Bulkhead full, rejecting call"
            );
            self.metrics.record_rejection("bulkhead");
            permit.record(CallResult::Abandoned);
            return Err(AttemptError::Rejected(PolicyError::BulkheadFull));
        };

        match op().await {
            Ok(value) => {
                permit.record(CallResult::Success);
                Ok(value)
            }
            Err(err) => {
                permit.record(CallResult::Failure);
                Err(AttemptError::Failed(err))
            }
        }
    }

    /// Number of calls handed to the chain.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}
