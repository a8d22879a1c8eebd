//! Runtime-switchable resilience for calls to an unreliable dependency.

pub mod admin;
pub mod chaos;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::{AppConfig, ConfigStore};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{PolicyChain, PolicyError, ToggleGate};
