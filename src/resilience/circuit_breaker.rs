//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: dependency assumed down, requests fail fast
//! - Half-Open: a single probe tests whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: after open_duration (on the next admission request)
//! Half-Open → Closed: probe request succeeds
//! Half-Open → Open: probe request fails
//! ```
//!
//! # Design Decisions
//! - `CircuitState` is a plain value with pure transition functions; the
//!   breaker only serializes access to it for the duration of a transition
//! - Fail fast in Open state (no waiting for timeout)
//! - Single probe in Half-Open (prevents hammering recovering dependency)
//! - Admissions are RAII guards: an abandoned probe frees the probe slot

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::MetricsSink;

/// Breaker phase plus the data each phase needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { probe_in_flight: bool },
}

/// Admission decision for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed; normal call.
    Pass,
    /// The single half-open probe.
    Probe,
    /// Fail fast.
    Reject,
}

/// Result of an admitted attempt as seen by the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallResult {
    Success,
    Failure,
    /// Never reached the dependency (cancelled or rejected further in).
    Abandoned,
}

impl CircuitState {
    pub const fn initial() -> Self {
        CircuitState::Closed { consecutive_failures: 0 }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CircuitState::Closed { .. } => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen { .. } => "half_open",
        }
    }

    /// Decide whether a call may proceed at `now`.
    pub fn admit(self, now: Instant, open_duration: Duration) -> (CircuitState, Admission) {
        match self {
            CircuitState::Closed { .. } => (self, Admission::Pass),
            CircuitState::Open { opened_at } => {
                if now.saturating_duration_since(opened_at) >= open_duration {
                    (CircuitState::HalfOpen { probe_in_flight: true }, Admission::Probe)
                } else {
                    (self, Admission::Reject)
                }
            }
            CircuitState::HalfOpen { probe_in_flight: false } => {
                (CircuitState::HalfOpen { probe_in_flight: true }, Admission::Probe)
            }
            CircuitState::HalfOpen { probe_in_flight: true } => (self, Admission::Reject),
        }
    }

    /// Apply the result of a call admitted as `admission`.
    pub fn record(
        self,
        admission: Admission,
        result: CallResult,
        now: Instant,
        failure_threshold: u32,
    ) -> CircuitState {
        match (self, admission, result) {
            (CircuitState::Closed { .. }, Admission::Pass, CallResult::Success) => {
                CircuitState::Closed { consecutive_failures: 0 }
            }
            (CircuitState::Closed { consecutive_failures }, Admission::Pass, CallResult::Failure) => {
                let failures = consecutive_failures.saturating_add(1);
                if failures >= failure_threshold {
                    CircuitState::Open { opened_at: now }
                } else {
                    CircuitState::Closed { consecutive_failures: failures }
                }
            }
            (CircuitState::HalfOpen { .. }, Admission::Probe, CallResult::Success) => {
                CircuitState::initial()
            }
            (CircuitState::HalfOpen { .. }, Admission::Probe, CallResult::Failure) => {
                CircuitState::Open { opened_at: now }
            }
            (CircuitState::HalfOpen { .. }, Admission::Probe, CallResult::Abandoned) => {
                CircuitState::HalfOpen { probe_in_flight: false }
            }
            // Stale results from calls admitted under an earlier phase, and
            // abandoned normal calls, leave the state alone.
            (state, _, _) => state,
        }
    }
}

/// Thread-safe circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<CircuitState>,
    failure_threshold: u32,
    open_duration: Duration,
    metrics: Arc<MetricsSink>,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig, metrics: Arc<MetricsSink>) -> Self {
        Self {
            state: Mutex::new(CircuitState::initial()),
            failure_threshold: config.failure_threshold.max(1),
            open_duration: Duration::from_millis(config.open_duration_ms),
            metrics,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> CircuitState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request admission. Returns `None` when the call must fail fast.
    pub fn try_acquire(&self) -> Option<BreakerPermit<'_>> {
        let admission = self.update(|state| state.admit(Instant::now(), self.open_duration));
        match admission {
            Admission::Reject => None,
            admission => Some(BreakerPermit {
                breaker: self,
                admission,
                settled: false,
            }),
        }
    }

    fn settle(&self, admission: Admission, result: CallResult) {
        let threshold = self.failure_threshold;
        self.update(|state| {
            (state.record(admission, result, Instant::now(), threshold), ())
        });
    }

    fn update<R>(&self, f: impl FnOnce(CircuitState) -> (CircuitState, R)) -> R {
        let (from, to, out) = {
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let from = *guard;
            let (to, out) = f(from);
            *guard = to;
            (from, to, out)
        };

        if from.name() != to.name() {
            tracing::warn!(from = from.name(), to = to.name(), "Circuit breaker state change");
            self.metrics.record_breaker_transition(from.name(), to.name());
        }
        out
    }
}

/// An admitted attempt. Dropping it unsettled counts as [`CallResult::Abandoned`].
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl BreakerPermit<'_> {
    pub fn is_probe(&self) -> bool {
        self.admission == Admission::Probe
    }

    pub fn record(mut self, result: CallResult) {
        self.settled = true;
        self.breaker.settle(self.admission, result);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.admission, CallResult::Abandoned);
        }
    }
}
