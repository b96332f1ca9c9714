//! Alert engine wiring.
//!
//! Adapts the order registry and the operator terminal to the alert
//! engine's `PendingSource` and `AlertSink` seams.

use comanda_alert::{AlertSink, PendingSource};
use comanda_registry::OrderRegistry;
use comanda_telemetry::Metrics;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Pending-count source backed by the order registry.
pub struct RegistryPendingSource {
    registry: Arc<OrderRegistry>,
}

impl RegistryPendingSource {
    /// Create a new source reading from the given registry.
    pub fn new(registry: Arc<OrderRegistry>) -> Self {
        Self { registry }
    }
}

impl PendingSource for RegistryPendingSource {
    fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }
}

/// Alert sink that rings the operator terminal bell.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl TerminalBell {
    /// Create a new terminal bell sink.
    pub fn new() -> Self {
        Self
    }
}

impl AlertSink for TerminalBell {
    fn pulse(&self) {
        // BEL is advisory; a detached terminal is not an error.
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
        Metrics::alert_pulse();
        debug!("Alert pulse");
    }
}
