//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable, policy parameters)
//!     → store.rs seeded with the toggle and fault settings
//!
//! At runtime:
//!     admin surface → store.rs setters (validated, atomic per field)
//!     protected calls → store.rs snapshot reads
//! ```
//!
//! # Design Decisions
//! - Static config is immutable once loaded; only the store mutates
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;

pub use schema::AppConfig;
pub use schema::{
    AdminConfig, BulkheadConfig, CircuitBreakerConfig, ListenerConfig, MockConfig,
    ObservabilityConfig, RateLimiterConfig, ResilienceConfig, RetryConfig,
};
pub use store::{ConfigSnapshot, ConfigStore, FaultSettings};
pub use validation::ValidationError;
