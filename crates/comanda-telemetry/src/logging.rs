//! Structured logging initialization.

use crate::error::TelemetryResult;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging.
///
/// Configures tracing with JSON output for production and pretty
/// output for development. The filter is taken from `RUST_LOG` when
/// set. All log output goes to stderr; stdout is reserved for the
/// operator terminal (the alert bell rings there).
pub fn init_logging() -> TelemetryResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,comanda=debug"));

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    if is_production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_names(true),
            )
            .init();
    }

    Ok(())
}
