//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (failure rate in [0, 1], delays non-negative,
//!   policy limits > 0)
//! - Shared by the startup loader and the runtime admin setters
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before a value is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A rejected configuration value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("failure rate must be between 0.0 and 1.0, got {0}")]
    FailureRateOutOfRange(f64),

    #[error("delay must be non-negative, got {0}")]
    NegativeDelay(i64),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("invalid socket address for {field}: '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check a failure probability.
///
/// NaN is rejected along with everything outside `[0.0, 1.0]`.
pub fn validate_failure_rate(rate: f64) -> Result<f64, ValidationError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ValidationError::FailureRateOutOfRange(rate))
    }
}

/// Check a delay bound and convert it to the unsigned representation.
pub fn validate_delay_ms(delay_ms: i64) -> Result<u64, ValidationError> {
    u64::try_from(delay_ms).map_err(|_| ValidationError::NegativeDelay(delay_ms))
}

/// Validate a whole configuration, collecting every problem.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive { field: "timeouts.request_secs" });
    }

    let resilience = &config.resilience;
    if resilience.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::NotPositive {
            field: "resilience.circuit_breaker.failure_threshold",
        });
    }
    if resilience.rate_limiter.capacity == 0 {
        errors.push(ValidationError::NotPositive { field: "resilience.rate_limiter.capacity" });
    }
    if !(resilience.rate_limiter.refill_per_sec > 0.0) {
        errors.push(ValidationError::NotPositive {
            field: "resilience.rate_limiter.refill_per_sec",
        });
    }
    if resilience.bulkhead.max_concurrent == 0 {
        errors.push(ValidationError::NotPositive { field: "resilience.bulkhead.max_concurrent" });
    }
    if resilience.retry.max_attempts == 0 {
        errors.push(ValidationError::NotPositive { field: "resilience.retry.max_attempts" });
    }

    if let Err(e) = validate_failure_rate(config.mock.failure_rate) {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
