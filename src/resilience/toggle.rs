//! The resilience toggle: entry point for every protected call.
//!
//! # Responsibilities
//! - Snapshot the master flag once, at call start
//! - Disabled: invoke the operation directly and hand back its result
//!   untouched, error type included
//! - Enabled: run the operation through the `PolicyChain`, converting a
//!   terminal chain failure into the caller's fallback value
//! - Record exactly one path event (`bypassed` / `active`) and one outcome
//!   per call
//!
//! # Design Decisions
//! - The gate is the outermost wrapper, built once at startup and shared
//! - Nothing but the metric records sees a bypassed call

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::ConfigStore;
use crate::observability::MetricsSink;
use crate::resilience::{PolicyChain, PolicyError, Transient};

/// Which way the gate sent a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePath {
    Bypassed,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Ran without policies; `error` holds the operation error if any.
    Bypassed,
    GuardedSuccess,
    /// The operation failed (retries exhausted or not retryable); the
    /// caller got the degraded response.
    GuardedFailure,
    /// Admission control turned the call away (open circuit, rate limit,
    /// full bulkhead); the caller got the degraded response.
    Fallback,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Bypassed => "bypassed",
            OutcomeKind::GuardedSuccess => "guarded_success",
            OutcomeKind::GuardedFailure => "guarded_failure",
            OutcomeKind::Fallback => "fallback",
        }
    }
}

/// Per-call record handed to the metrics sink.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub kind: OutcomeKind,
    pub duration: Duration,
    pub error: Option<String>,
}

impl CallOutcome {
    /// Whether the caller received the fallback value.
    pub fn is_degraded(&self) -> bool {
        matches!(self.kind, OutcomeKind::GuardedFailure | OutcomeKind::Fallback)
    }

    pub fn path(&self) -> GatePath {
        match self.kind {
            OutcomeKind::Bypassed => GatePath::Bypassed,
            _ => GatePath::Active,
        }
    }
}

#[derive(Debug)]
pub struct ToggleGate {
    store: Arc<ConfigStore>,
    chain: Arc<PolicyChain>,
    metrics: Arc<MetricsSink>,
}

impl ToggleGate {
    pub fn new(store: Arc<ConfigStore>, chain: Arc<PolicyChain>, metrics: Arc<MetricsSink>) -> Self {
        Self { store, chain, metrics }
    }

    /// Invoke `op` under the identity `operation`.
    ///
    /// When resilience is enabled the result is always `Ok`: either the
    /// operation's value or `fallback`'s degraded value.
    pub async fn invoke<T, E, F, Fut, FB>(&self, operation: &str, op: F, fallback: FB) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce(&PolicyError<E>) -> T,
        E: Transient + fmt::Display,
    {
        self.invoke_with_outcome(operation, op, fallback).await.0
    }

    /// Like [`invoke`](Self::invoke), also returning the recorded outcome.
    pub async fn invoke_with_outcome<T, E, F, Fut, FB>(
        &self,
        operation: &str,
        mut op: F,
        fallback: FB,
    ) -> (Result<T, E>, CallOutcome)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce(&PolicyError<E>) -> T,
        E: Transient + fmt::Display,
    {
        let start = Instant::now();
        let enabled = self.store.is_enabled();

        let (result, kind, error) = if !enabled {
            tracing::info!(method = operation, "Resilience disabled, bypassing policy chain");
            self.metrics.record_gate_path(operation, GatePath::Bypassed);

            let result = op().await;
            let error = result.as_ref().err().map(ToString::to_string);
            (result, OutcomeKind::Bypassed, error)
        } else {
            tracing::trace!(method = operation, "Resilience enabled, proceeding through policy chain");
            self.metrics.record_gate_path(operation, GatePath::Active);

            match self.chain.execute(op).await {
                Ok(value) => (Ok(value), OutcomeKind::GuardedSuccess, None),
                Err(err) => {
                    let kind = if err.operation_error().is_some() {
                        OutcomeKind::GuardedFailure
                    } else {
                        OutcomeKind::Fallback
                    };
                    self.metrics.record_fallback();
                    let message = err.to_string();
                    (Ok(fallback(&err)), kind, Some(message))
                }
            }
        };

        let outcome = CallOutcome {
            kind,
            duration: start.elapsed(),
            error,
        };
        self.metrics.record_outcome(operation, &outcome);
        (result, outcome)
    }

    pub fn chain(&self) -> &PolicyChain {
        &self.chain
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResilienceConfig;
    use crate::observability::metrics::{
        CALL_DURATION, CALL_OUTCOME, SERVICE_FALLBACK, TOGGLE_ACTIVE, TOGGLE_BYPASSED,
    };

    #[derive(Debug, PartialEq)]
    enum OrderError {
        NotFound(u32),
    }

    impl fmt::Display for OrderError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                OrderError::NotFound(id) => write!(f, "order {id} not found"),
            }
        }
    }

    impl Transient for OrderError {}

    fn gate(enabled: bool) -> (ToggleGate, Arc<MetricsSink>) {
        let metrics = Arc::new(MetricsSink::new());
        let store = Arc::new(ConfigStore::new(enabled, 0.0, 0).unwrap());
        let chain = Arc::new(PolicyChain::new(&ResilienceConfig::default(), metrics.clone()));
        (ToggleGate::new(store, chain, metrics.clone()), metrics)
    }

    #[tokio::test]
    async fn test_bypass_returns_exact_error() {
        let (gate, metrics) = gate(false);
        let (result, outcome) = gate
            .invoke_with_outcome(
                "orders.find",
                || async { Err::<String, _>(OrderError::NotFound(7)) },
                |_| "fallback".to_string(),
            )
            .await;

        assert_eq!(result, Err(OrderError::NotFound(7)));
        assert_eq!(outcome.kind, OutcomeKind::Bypassed);
        assert_eq!(outcome.error.as_deref(), Some("order 7 not found"));
        assert_eq!(gate.chain().invocations(), 0);
        assert_eq!(gate.chain().bulkhead().in_flight(), 0);
        assert_eq!(metrics.counter_value(TOGGLE_BYPASSED, &[("method", "orders.find")]), 1);
        assert_eq!(metrics.counter_total(TOGGLE_ACTIVE), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_failure_becomes_fallback() {
        let (gate, metrics) = gate(true);
        let (result, outcome) = gate
            .invoke_with_outcome(
                "orders.find",
                || async { Err::<String, _>(OrderError::NotFound(7)) },
                |err| format!("degraded ({})", err.kind()),
            )
            .await;

        assert_eq!(result, Ok("degraded (retry_exhausted)".to_string()));
        assert_eq!(outcome.kind, OutcomeKind::GuardedFailure);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.error.as_deref(), Some("retries exhausted after 3 attempts: order 7 not found"));
        assert_eq!(outcome.path(), GatePath::Active);
        assert_eq!(gate.chain().invocations(), 1);
        assert_eq!(metrics.counter_total(SERVICE_FALLBACK), 1);
        assert_eq!(
            metrics.counter_value(CALL_OUTCOME, &[("method", "orders.find"), ("kind", "guarded_failure")]),
            1
        );
        assert_eq!(metrics.counter_total(CALL_OUTCOME), 1, "one outcome per call");
        assert_eq!(metrics.timing_count(CALL_DURATION), 1);
    }

    #[tokio::test]
    async fn test_admission_rejection_is_fallback() {
        let metrics = Arc::new(MetricsSink::new());
        let store = Arc::new(ConfigStore::new(true, 0.0, 0).unwrap());
        let mut config = ResilienceConfig::default();
        config.rate_limiter.capacity = 0;
        let chain = Arc::new(PolicyChain::new(&config, metrics.clone()));
        let gate = ToggleGate::new(store, chain, metrics.clone());

        let (result, outcome) = gate
            .invoke_with_outcome("orders.find", || async { Ok::<_, OrderError>(1) }, |_| 0)
            .await;

        assert_eq!(result, Ok(0));
        assert_eq!(outcome.kind, OutcomeKind::Fallback);
        assert_eq!(metrics.counter_total(CALL_OUTCOME), 1);
        assert_eq!(metrics.counter_total(SERVICE_FALLBACK), 1);
    }

    #[tokio::test]
    async fn test_enabled_success() {
        let (gate, metrics) = gate(true);
        let result = gate
            .invoke("orders.find", || async { Ok::<_, OrderError>(42) }, |_| 0)
            .await;
        assert_eq!(result, Ok(42));
        assert_eq!(metrics.counter_value(TOGGLE_ACTIVE, &[("method", "orders.find")]), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_is_read_once_per_call() {
        let (gate, metrics) = gate(true);
        let store = gate.store.clone();
        let result = gate
            .invoke(
                "orders.find",
                || {
                    let store = store.clone();
                    async move {
                        // Flipping mid-call does not change this call's path.
                        store.set_enabled(false);
                        Err::<u32, _>(OrderError::NotFound(1))
                    }
                },
                |_| 0,
            )
            .await;

        assert_eq!(result, Ok(0));
        assert_eq!(metrics.counter_total(TOGGLE_BYPASSED), 0);
        assert_eq!(metrics.counter_total(SERVICE_FALLBACK), 1);
    }
}
