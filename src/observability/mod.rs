//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gate, policy chain and fault injector produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//!     → in-process tallies (tests, CLI diagnostics)
//! ```

pub mod logging;
pub mod metrics;

pub use metrics::MetricsSink;
