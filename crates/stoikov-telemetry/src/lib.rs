//! Prometheus metrics and structured logging for the stoikov market maker.
//!
//! - Prometheus metrics for throttle usage, cover-only mode and rejects
//! - Structured logging with tracing (JSON in production, pretty otherwise)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
