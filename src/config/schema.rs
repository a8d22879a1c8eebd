//! Configuration schema definitions.
//!
//! This module defines the static startup configuration for the service.
//! Every section is optional in the TOML file; missing fields default.
//! Values that change at runtime (the resilience toggle and the fault
//! injection settings) only seed the [`ConfigStore`](crate::config::ConfigStore).

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    pub timeouts: TimeoutConfig,

    /// Resilience policy parameters and the initial toggle state.
    pub resilience: ResilienceConfig,

    /// Initial fault injection settings for the simulated dependency.
    pub mock: MockConfig,

    /// Logging and metrics export.
    pub observability: ObservabilityConfig,

    /// Admin surface settings.
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address the HTTP API listens on.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on one HTTP request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Resilience configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Master toggle at startup. When false every protected call bypasses
    /// the policy chain.
    pub enabled: bool,

    pub circuit_breaker: CircuitBreakerConfig,

    pub rate_limiter: RateLimiterConfig,

    pub bulkhead: BulkheadConfig,

    pub retry: RetryConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            circuit_breaker: CircuitBreakerConfig::default(),
            rate_limiter: RateLimiterConfig::default(),
            bulkhead: BulkheadConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in `Closed` before the circuit opens.
    pub failure_threshold: u32,

    /// Cool-down in milliseconds before an open circuit admits a probe.
    pub open_duration_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_ms: 10_000,
        }
    }
}

/// Token bucket rate limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Bucket capacity (burst size).
    pub capacity: u32,

    /// Tokens added per second.
    pub refill_per_sec: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            refill_per_sec: 50.0,
        }
    }
}

/// Bulkhead (concurrency limiter) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BulkheadConfig {
    /// Maximum concurrent executions of the protected operation.
    pub max_concurrent: usize,

    /// How long a call may wait for a free slot. Zero rejects immediately.
    pub max_wait_ms: u64,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_wait_ms: 0,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Wait before the second attempt, in milliseconds. Doubles per attempt.
    pub base_delay_ms: u64,

    /// Cap on any single wait, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 1000,
        }
    }
}

/// Fault injection settings for the simulated external dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MockConfig {
    /// Probability in [0.0, 1.0] that a call fails.
    pub failure_rate: f64,

    /// Jitter bound; each call sleeps uniformly in [0, 2 * delay_ms).
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.1,
            delay_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default level when `RUST_LOG` is unset.
    pub log_level: String,

    /// Serve Prometheus metrics.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// API key for authentication (Bearer token). `None` leaves the admin
    /// routes open.
    pub api_key: Option<String>,
}
