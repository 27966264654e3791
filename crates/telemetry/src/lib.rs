//! In-process telemetry for the group-coordinated consumer: metrics,
//! liveness health, tracing setup, and the default [`Instrumenter`]
//! implementation wired into `consumer-core`'s callback-invocation hook.
//!
//! There is no external metrics sink here — the ambient stack this crate
//! carries is scoped to what the core itself can observe about its own
//! behavior (lag, commit/heartbeat/fetch latency, liveness), not a
//! downstream pipeline's metrics.

pub mod health;
pub mod instrumenter;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use instrumenter::*;
pub use metrics::*;
pub use tracing_setup::*;
