//! In-process telemetry for the rebate engine.
//!
//! Counters and histograms live in a global registry and are exposed on
//! the health endpoint; logging goes through `tracing`.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
