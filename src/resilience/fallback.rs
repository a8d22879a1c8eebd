//! Degraded responses served when the policy chain fails a call.

use std::fmt;

use crate::resilience::PolicyError;

/// Fixed degraded payload for the external service.
pub const DEGRADED_RESPONSE: &str =
    "Graceful Degradation: external service temporarily unavailable, serving default response";

/// Fallback for the external service: logs why and returns [`DEGRADED_RESPONSE`].
pub fn degraded_response<E: fmt::Display>(err: &PolicyError<E>) -> String {
    tracing::info!(reason = err.kind(), error = %err, "Serving fallback response");
    DEGRADED_RESPONSE.to_string()
}
