//! Token bucket rate limiter.
//!
//! A call is admitted only if a whole token is available. There is no
//! queueing: an empty bucket rejects immediately.

use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;

use crate::config::RateLimiterConfig;

/// Bucket state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucket {
    pub tokens: f64,
    pub capacity: f64,
    pub refill_per_sec: f64,
    pub last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(capacity: f64, refill_per_sec: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec,
            last_refill: now,
        }
    }

    /// Add the tokens accrued since the last refill, capped at capacity.
    pub fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared rate limiter guarding one protected operation.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(
                f64::from(config.capacity),
                config.refill_per_sec,
                Instant::now(),
            )),
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.bucket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_acquire(Instant::now())
    }

    /// Tokens currently available, after refilling.
    pub fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.refill(Instant::now());
        bucket.tokens
    }

    pub fn state(&self) -> TokenBucket {
        *self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
