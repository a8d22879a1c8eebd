//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the service metrics (toggle path, dependency outcomes, policy
//!   rejections, breaker transitions)
//! - Expose Prometheus-compatible metrics endpoint
//! - Keep in-process tallies so values can be read without a scrape
//!
//! # Metrics
//! - `resilience.toggle.bypassed{method}` (counter): calls that skipped the chain
//! - `resilience.toggle.active{method}` (counter): calls routed through the chain
//! - `resilience.toggle.changed{from,to}` (counter): admin toggle events
//! - `resilience.toggle.state` (gauge): 1=enabled, 0=disabled
//! - `external.service.success` / `external.service.failures` (counters)
//! - `external.service.fallback` (counter): degraded responses served
//! - `external.service.duration` (histogram, seconds)
//! - `resilience.call.outcome{method,kind}` / `resilience.call.duration`
//! - `resilience.policy.rejected{policy}` / `resilience.retry.attempts`
//! - `resilience.circuitbreaker.transitions{from,to}`
//!
//! # Design Decisions
//! - Every update goes through the `metrics` facade (a no-op until a
//!   recorder is installed) and into a `DashMap` tally
//! - Labels are owned strings; metric names are static

use std::net::SocketAddr;
use std::time::Duration;

use dashmap::DashMap;
use metrics::Label;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::toggle::{CallOutcome, GatePath};

pub const TOGGLE_BYPASSED: &str = "resilience.toggle.bypassed";
pub const TOGGLE_ACTIVE: &str = "resilience.toggle.active";
pub const TOGGLE_CHANGED: &str = "resilience.toggle.changed";
pub const TOGGLE_STATE: &str = "resilience.toggle.state";
pub const SERVICE_SUCCESS: &str = "external.service.success";
pub const SERVICE_FAILURES: &str = "external.service.failures";
pub const SERVICE_FALLBACK: &str = "external.service.fallback";
pub const SERVICE_DURATION: &str = "external.service.duration";
pub const CALL_OUTCOME: &str = "resilience.call.outcome";
pub const CALL_DURATION: &str = "resilience.call.duration";
pub const POLICY_REJECTED: &str = "resilience.policy.rejected";
pub const RETRY_ATTEMPTS: &str = "resilience.retry.attempts";
pub const BREAKER_TRANSITIONS: &str = "resilience.circuitbreaker.transitions";

type SeriesKey = (&'static str, Vec<(&'static str, String)>);

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Records every observable event of the service.
#[derive(Debug, Default)]
pub struct MetricsSink {
    counters: DashMap<SeriesKey, u64>,
    gauges: DashMap<&'static str, f64>,
    timings: DashMap<&'static str, u64>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Generic primitives ---

    pub fn increment(&self, name: &'static str, labels: &[(&'static str, String)]) {
        let facade_labels: Vec<Label> = labels
            .iter()
            .map(|(k, v)| Label::new(*k, v.clone()))
            .collect();
        metrics::counter!(name, facade_labels).increment(1);

        let mut key_labels = labels.to_vec();
        key_labels.sort();
        *self.counters.entry((name, key_labels)).or_insert(0) += 1;
    }

    pub fn set_gauge(&self, name: &'static str, value: f64) {
        metrics::gauge!(name).set(value);
        self.gauges.insert(name, value);
    }

    pub fn record_duration(&self, name: &'static str, duration: Duration) {
        metrics::histogram!(name).record(duration.as_secs_f64());
        *self.timings.entry(name).or_insert(0) += 1;
    }

    /// Current tally of a counter series. Label order does not matter.
    pub fn counter_value(&self, name: &'static str, labels: &[(&'static str, &str)]) -> u64 {
        let mut key_labels: Vec<(&'static str, String)> =
            labels.iter().map(|(k, v)| (*k, (*v).to_string())).collect();
        key_labels.sort();
        self.counters
            .get(&(name, key_labels))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Sum of a counter across all label sets.
    pub fn counter_total(&self, name: &'static str) -> u64 {
        self.counters
            .iter()
            .filter(|entry| entry.key().0 == name)
            .map(|entry| *entry.value())
            .sum()
    }

    pub fn gauge_value(&self, name: &'static str) -> Option<f64> {
        self.gauges.get(name).map(|v| *v)
    }

    /// Number of samples recorded into a timer.
    pub fn timing_count(&self, name: &'static str) -> u64 {
        self.timings.get(name).map(|v| *v).unwrap_or(0)
    }

    // --- Domain events ---

    /// One event per protected call, tagged with the path it took.
    pub fn record_gate_path(&self, operation: &str, path: GatePath) {
        let name = match path {
            GatePath::Bypassed => TOGGLE_BYPASSED,
            GatePath::Active => TOGGLE_ACTIVE,
        };
        self.increment(name, &[("method", operation.to_string())]);
    }

    pub fn record_outcome(&self, operation: &str, outcome: &CallOutcome) {
        self.increment(
            CALL_OUTCOME,
            &[
                ("method", operation.to_string()),
                ("kind", outcome.kind.as_str().to_string()),
            ],
        );
        self.record_duration(CALL_DURATION, outcome.duration);
    }

    pub fn record_toggle(&self, previous: bool, current: bool) {
        self.increment(
            TOGGLE_CHANGED,
            &[("from", previous.to_string()), ("to", current.to_string())],
        );
        self.set_gauge(TOGGLE_STATE, if current { 1.0 } else { 0.0 });
    }

    pub fn record_dependency_success(&self, duration: Duration) {
        self.increment(SERVICE_SUCCESS, &[]);
        self.record_duration(SERVICE_DURATION, duration);
    }

    pub fn record_dependency_failure(&self) {
        self.increment(SERVICE_FAILURES, &[]);
    }

    pub fn record_fallback(&self) {
        self.increment(SERVICE_FALLBACK, &[]);
    }

    pub fn record_rejection(&self, policy: &'static str) {
        self.increment(POLICY_REJECTED, &[("policy", policy.to_string())]);
    }

    pub fn record_retry_attempt(&self) {
        self.increment(RETRY_ATTEMPTS, &[]);
    }

    pub fn record_breaker_transition(&self, from: &'static str, to: &'static str) {
        self.increment(
            BREAKER_TRANSITIONS,
            &[("from", from.to_string()), ("to", to.to_string())],
        );
    }
}
