//! Telemetry for the tenant provisioner.
//!
//! Structured logging through `tracing`, a process-wide health registry for
//! the external systems the provisioner depends on, and in-process counters
//! that the CLI can dump as JSON.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
