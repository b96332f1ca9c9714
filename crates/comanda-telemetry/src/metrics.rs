//! Prometheus metrics for the order feed.
//!
//! Provides observability for:
//! - Connection state and reconnects
//! - Feed events and drops
//! - Order counts and alert activity
//! - Backend commands and snapshot fetches
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram,
    register_int_counter, register_int_gauge, CounterVec, Gauge, GaugeVec, Histogram, IntCounter,
    IntGauge, TextEncoder,
};

/// WebSocket connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "comanda_ws_connected",
        "WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Connection state machine current state.
/// Labels: state (disconnected/connecting/connected/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "comanda_ws_state",
        "Connection state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total WebSocket reconnection attempts.
pub static WS_RECONNECT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "comanda_ws_reconnect_total",
        "Total WebSocket reconnection attempts"
    )
    .unwrap()
});

/// Total feed events applied by kind.
/// Labels: kind (new_order/status_update)
pub static FEED_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "comanda_feed_events_total",
        "Total feed events applied by kind",
        &["kind"]
    )
    .unwrap()
});

/// Total feed frames dropped by reason.
/// Labels: reason (parse_error/unknown_type)
pub static FEED_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "comanda_feed_dropped_total",
        "Total feed frames dropped without being applied",
        &["reason"]
    )
    .unwrap()
});

/// Orders currently pending acceptance.
pub static ORDERS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "comanda_orders_pending",
        "Orders currently pending acceptance"
    )
    .unwrap()
});

/// Orders currently tracked in the registry.
pub static ORDERS_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "comanda_orders_tracked",
        "Orders currently tracked in the registry"
    )
    .unwrap()
});

/// Total alert pulses emitted.
pub static ALERT_PULSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("comanda_alert_pulses_total", "Total alert pulses emitted").unwrap()
});

/// Alert loop state (1=running, 0=stopped).
pub static ALERT_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("comanda_alert_active", "Alert loop state (1=running)").unwrap()
});

/// Total lifecycle commands by action and outcome.
/// Labels: action (accept/reject/complete), outcome (ok/rejected/failed)
pub static COMMANDS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "comanda_commands_total",
        "Total lifecycle commands sent to the backend",
        &["action", "outcome"]
    )
    .unwrap()
});

/// Total snapshot fetches by outcome.
/// Labels: outcome (ok/error)
pub static SNAPSHOT_FETCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "comanda_snapshot_fetches_total",
        "Total order snapshot fetches",
        &["outcome"]
    )
    .unwrap()
});

/// Snapshot fetch latency in milliseconds.
pub static SNAPSHOT_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "comanda_snapshot_latency_ms",
        "Order snapshot fetch latency in milliseconds",
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record WebSocket connected.
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    /// Record WebSocket disconnected.
    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Set connection state machine state.
    /// Only the active state should be set to 1, all others to 0.
    pub fn ws_state_set(state: &str) {
        for s in &["disconnected", "connecting", "connected", "reconnecting"] {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Record a reconnection attempt.
    pub fn ws_reconnect() {
        WS_RECONNECT_TOTAL.inc();
    }

    /// Record an applied feed event.
    pub fn feed_event(kind: &str) {
        FEED_EVENTS_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a dropped feed frame.
    pub fn feed_dropped(reason: &str) {
        FEED_DROPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Update the pending order gauge.
    pub fn orders_pending_set(count: i64) {
        ORDERS_PENDING.set(count);
    }

    /// Update the tracked order gauge.
    pub fn orders_tracked_set(count: i64) {
        ORDERS_TRACKED.set(count);
    }

    /// Record an alert pulse.
    pub fn alert_pulse() {
        ALERT_PULSES_TOTAL.inc();
    }

    /// Set the alert loop state.
    pub fn alert_active(active: bool) {
        ALERT_ACTIVE.set(if active { 1 } else { 0 });
    }

    /// Record a lifecycle command outcome.
    pub fn command_result(action: &str, outcome: &str) {
        COMMANDS_TOTAL.with_label_values(&[action, outcome]).inc();
    }

    /// Record a snapshot fetch outcome.
    pub fn snapshot_fetch(outcome: &str) {
        SNAPSHOT_FETCHES_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record snapshot fetch latency.
    pub fn snapshot_latency(latency_ms: f64) {
        SNAPSHOT_LATENCY_MS.observe(latency_ms);
    }
}

/// Encode all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    encoder
        .encode_to_string(&families)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_state_set_is_exclusive() {
        Metrics::ws_state_set("connected");
        assert_eq!(WS_STATE.with_label_values(&["connected"]).get(), 1.0);
        assert_eq!(WS_STATE.with_label_values(&["disconnected"]).get(), 0.0);

        Metrics::ws_state_set("reconnecting");
        assert_eq!(WS_STATE.with_label_values(&["reconnecting"]).get(), 1.0);
        assert_eq!(WS_STATE.with_label_values(&["connected"]).get(), 0.0);
    }

    #[test]
    fn test_counters_accumulate() {
        let before = FEED_EVENTS_TOTAL.with_label_values(&["new_order"]).get();
        Metrics::feed_event("new_order");
        Metrics::feed_event("new_order");
        let after = FEED_EVENTS_TOTAL.with_label_values(&["new_order"]).get();
        assert_eq!(after - before, 2.0);
    }

    #[test]
    fn test_gather_metrics_includes_registered_names() {
        Metrics::orders_pending_set(3);
        Metrics::alert_pulse();

        let text = gather_metrics().unwrap();
        assert!(text.contains("comanda_orders_pending"));
        assert!(text.contains("comanda_alert_pulses_total"));
    }
}
