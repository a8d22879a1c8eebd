//! Fault injector for the simulated external service.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::time::Instant;

use crate::config::ConfigStore;
use crate::observability::MetricsSink;
use crate::resilience::Transient;

/// Injected dependency failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("External service unavailable (simulated failure)")]
pub struct SimulatedFailure;

impl Transient for SimulatedFailure {}

/// Simulates calls to an unreliable dependency.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    store: Arc<ConfigStore>,
    metrics: Arc<MetricsSink>,
}

impl FaultInjector {
    pub fn new(store: Arc<ConfigStore>, metrics: Arc<MetricsSink>) -> Self {
        Self { store, metrics }
    }

    /// One simulated call: sleep a jittered delay, then fail with
    /// probability `failure_rate`.
    ///
    /// The settings are snapshotted once at the start of the call.
    pub async fn call(&self) -> Result<String, SimulatedFailure> {
        let start = Instant::now();
        let settings = self.store.fault_settings();

        let jitter = jitter_delay(settings.delay_ms);
        if !jitter.is_zero() {
            tokio::time::sleep(jitter).await;
        }

        if should_fail(settings.failure_rate, fastrand::f64()) {
            self.metrics.record_dependency_failure();
            tracing::warn!(failure_rate = settings.failure_rate, "External service call failed (simulated)");
            return Err(SimulatedFailure);
        }

        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        self.metrics.record_dependency_success(start.elapsed());
        tracing::debug!(jitter_ms = jitter.as_millis() as u64, "External service call succeeded");
        Ok(format!("External service response: {now_ms}"))
    }
}

/// Uniform delay in `[0, 2 * delay_ms)`.
fn jitter_delay(delay_ms: u64) -> Duration {
    if delay_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(fastrand::u64(0..delay_ms.saturating_mul(2)))
}

/// `draw` is uniform in `[0, 1)`, so rate 0 never fails and rate 1 always does.
fn should_fail(failure_rate: f64, draw: f64) -> bool {
    draw < failure_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::{SERVICE_DURATION, SERVICE_FAILURES, SERVICE_SUCCESS};

    fn injector(failure_rate: f64, delay_ms: u64) -> (FaultInjector, Arc<ConfigStore>, Arc<MetricsSink>) {
        let store = Arc::new(ConfigStore::new(true, failure_rate, delay_ms).unwrap());
        let metrics = Arc::new(MetricsSink::new());
        (FaultInjector::new(store.clone(), metrics.clone()), store, metrics)
    }

    #[test]
    fn test_boundaries_are_exact() {
        for draw in [0.0, 0.5, 0.999_999_999] {
            assert!(!should_fail(0.0, draw));
            assert!(should_fail(1.0, draw));
        }
        assert!(should_fail(0.5, 0.49));
        assert!(!should_fail(0.5, 0.5));
    }

    #[test]
    fn test_jitter_range() {
        assert_eq!(jitter_delay(0), Duration::ZERO);
        for _ in 0..1000 {
            assert!(jitter_delay(50) < Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn test_zero_rate_never_fails() {
        let (injector, _, metrics) = injector(0.0, 0);
        for _ in 0..500 {
            let response = injector.call().await.unwrap();
            assert!(response.starts_with("External service response: "));
        }
        assert_eq!(metrics.counter_total(SERVICE_SUCCESS), 500);
        assert_eq!(metrics.counter_total(SERVICE_FAILURES), 0);
        assert_eq!(metrics.timing_count(SERVICE_DURATION), 500);
    }

    #[tokio::test]
    async fn test_full_rate_always_fails() {
        let (injector, _, metrics) = injector(1.0, 0);
        for _ in 0..500 {
            assert_eq!(injector.call().await, Err(SimulatedFailure));
        }
        assert_eq!(metrics.counter_total(SERVICE_FAILURES), 500);
    }

    #[tokio::test]
    async fn test_settings_are_read_per_call() {
        let (injector, store, _) = injector(1.0, 0);
        assert!(injector.call().await.is_err());
        store.set_failure_rate(0.0).unwrap();
        assert!(injector.call().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_call_keeps_its_snapshot() {
        let (injector, store, _) = injector(0.0, 500);
        let call = tokio::spawn({
            let injector = injector.clone();
            async move { injector.call().await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        store.set_failure_rate(1.0).unwrap();
        assert!(call.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_applied() {
        let (injector, _, _) = injector(0.0, 100);
        let start = Instant::now();
        for _ in 0..20 {
            injector.call().await.unwrap();
        }
        let elapsed = start.elapsed();
        assert!(elapsed > Duration::ZERO);
        assert!(elapsed < Duration::from_millis(20 * 200));
    }
}
