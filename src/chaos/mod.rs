//! Simulated unreliable dependency.
//!
//! The fault injector stands in for a real external service. Its behavior
//! (failure probability, latency jitter) is read from the shared
//! `ConfigStore` on every call, so operators can degrade or heal the
//! dependency while traffic is flowing.

pub mod fault_injector;

pub use fault_injector::{FaultInjector, SimulatedFailure};
