//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Protected call:
//!     → toggle.rs (snapshot the master flag)
//!         disabled → operation invoked directly, result returned verbatim
//!         enabled  → chain.rs, once per attempt:
//!             → circuit_breaker.rs (fail fast while open)
//!             → rate_limiter.rs (token bucket admission)
//!             → bulkhead.rs (concurrency slot)
//!             → operation
//!           between attempts: retries.rs (decide, then wait backoff.rs
//!           delay with no slot, token or probe held)
//!             → on terminal failure: fallback.rs (degraded response)
//! ```
//!
//! # Design Decisions
//! - Every policy is an explicit value with explicit state, composed in a
//!   fixed order by `PolicyChain`
//! - Admission rejections are never retried
//! - Cancellation is future drop; slots and probes are RAII guards

use thiserror::Error;

pub mod backoff;
pub mod bulkhead;
pub mod chain;
pub mod circuit_breaker;
pub mod fallback;
pub mod rate_limiter;
pub mod retries;
pub mod toggle;

pub use bulkhead::{Bulkhead, BulkheadState};
pub use chain::PolicyChain;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use rate_limiter::RateLimiter;
pub use retries::RetryPolicy;
pub use toggle::{CallOutcome, GatePath, OutcomeKind, ToggleGate};

/// Terminal failure of a guarded call.
#[derive(Debug, Error)]
pub enum PolicyError<E> {
    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("bulkhead is full")]
    BulkheadFull,

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: E },

    #[error("{0}")]
    Operation(E),
}

impl<E> PolicyError<E> {
    /// True for rejections raised by admission control rather than by the
    /// operation itself.
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            PolicyError::CircuitOpen | PolicyError::RateLimited | PolicyError::BulkheadFull
        )
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyError::CircuitOpen => "circuit_open",
            PolicyError::RateLimited => "rate_limited",
            PolicyError::BulkheadFull => "bulkhead_full",
            PolicyError::RetryExhausted { .. } => "retry_exhausted",
            PolicyError::Operation(_) => "operation",
        }
    }

    /// The operation's own error, if the failure came from it.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            PolicyError::RetryExhausted { last, .. } => Some(last),
            PolicyError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Classifies operation errors for the retry policy.
pub trait Transient {
    fn is_transient(&self) -> bool {
        true
    }
}

impl Transient for std::io::Error {
    fn is_transient(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::TimedOut
                | ErrorKind::Interrupted
                | ErrorKind::WouldBlock
        )
    }
}
