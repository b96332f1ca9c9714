//! Prometheus metrics and structured logging for Comanda.
//!
//! Provides observability for the live order feed:
//! - Prometheus metrics for connection state, feed events, commands
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{gather_metrics, Metrics};
