//! Live order session.
//!
//! Owns everything one dashboard instance needs: the order registry,
//! the alert engine, and the feed connection. All inbound occurrences
//! funnel through [`SessionEvent`] and a single `dispatch` so ordering
//! is decided in one place, and `teardown()` stops every task the
//! session spawned.

use crate::alert::RegistryPendingSource;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use comanda_alert::{AlertEngine, DynAlertSink};
use comanda_core::{Order, OrderAction, OrderId, OrderStatus};
use comanda_feed::{EventParser, FeedEvent};
use comanda_registry::{DynCommandSink, DynSnapshotSource, OrderRegistry, RegistryError};
use comanda_telemetry::Metrics;
use comanda_ws::{ConnectionManager, ConnectionState, SocketEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Interval between periodic statistics log lines.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// One inbound occurrence, normalized.
///
/// Feed frames and connection state changes arrive on the same channel
/// and are applied strictly in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A new order was placed.
    NewOrder(Order),
    /// An existing order changed status remotely.
    StatusUpdate {
        order_id: OrderId,
        order_status: OrderStatus,
        table_number: u32,
    },
    /// The feed connection state changed.
    ConnectionChanged(ConnectionState),
}

impl From<FeedEvent> for SessionEvent {
    fn from(event: FeedEvent) -> Self {
        match event {
            FeedEvent::NewOrder(order) => Self::NewOrder(order),
            FeedEvent::StatusUpdate {
                order_id,
                order_status,
                table_number,
            } => Self::StatusUpdate {
                order_id,
                order_status,
                table_number,
            },
        }
    }
}

/// Live order session.
pub struct LiveOrdersSession {
    registry: Arc<OrderRegistry>,
    alert: AlertEngine,
    connection: Arc<ConnectionManager>,
    snapshots: DynSnapshotSource,
    commands: DynCommandSink,
    parser: EventParser,
    /// Consumed by `run()`; `None` afterwards.
    events: Mutex<Option<mpsc::Receiver<SocketEvent>>>,
    ws_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl LiveOrdersSession {
    /// Create a new session.
    ///
    /// Nothing is spawned here; the feed connection starts with
    /// `run()` and the alert loop with the first pending order.
    pub fn new(
        config: &AppConfig,
        snapshots: DynSnapshotSource,
        commands: DynCommandSink,
        alert_sink: DynAlertSink,
    ) -> Self {
        let registry = Arc::new(OrderRegistry::new());
        let (event_tx, event_rx) = mpsc::channel::<SocketEvent>(1000);
        let connection = Arc::new(ConnectionManager::new(config.connection_config(), event_tx));
        let alert = AlertEngine::new(
            Arc::new(RegistryPendingSource::new(registry.clone())),
            alert_sink,
            config.alert.clone().into(),
        );

        Self {
            registry,
            alert,
            connection,
            snapshots,
            commands,
            parser: EventParser::new(),
            events: Mutex::new(Some(event_rx)),
            ws_task: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// The order registry backing this session.
    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    /// Current feed connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Reconnect attempts since startup.
    pub fn reconnect_count(&self) -> u32 {
        self.connection.reconnect_count()
    }

    /// Whether the alert loop is currently running.
    pub fn alert_active(&self) -> bool {
        self.alert.is_active()
    }

    /// Fetch the full order list and replace the registry contents.
    ///
    /// Called once at startup and on manual refresh; these are the
    /// only full fetches. A feed reconnect never triggers one, the
    /// live events are trusted to carry every later change.
    pub async fn load_snapshot(&self) -> AppResult<()> {
        info!("Fetching order snapshot");
        let started = Instant::now();
        let orders = match self.snapshots.fetch_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                Metrics::snapshot_fetch("error");
                error!(error = %e, "Order snapshot fetch failed");
                return Err(e.into());
            }
        };
        Metrics::snapshot_fetch("ok");
        Metrics::snapshot_latency(started.elapsed().as_millis() as f64);

        let count = orders.len();
        self.registry.load_snapshot(orders);
        self.refresh_alert();
        info!(
            count,
            pending = self.registry.pending_count(),
            "Order snapshot loaded"
        );
        Ok(())
    }

    /// Manually re-fetch the order list.
    pub async fn refresh(&self) -> AppResult<()> {
        info!("Manual refresh requested");
        self.load_snapshot().await
    }

    /// Accept a pending order.
    pub async fn accept_order(&self, order_id: &OrderId) -> AppResult<()> {
        self.execute_action(order_id, OrderAction::Accept).await
    }

    /// Reject a pending order.
    pub async fn reject_order(&self, order_id: &OrderId) -> AppResult<()> {
        self.execute_action(order_id, OrderAction::Reject).await
    }

    /// Mark an accepted order as completed.
    pub async fn complete_order(&self, order_id: &OrderId) -> AppResult<()> {
        self.execute_action(order_id, OrderAction::Complete).await
    }

    /// Send a lifecycle command to the backend.
    ///
    /// The backend is the gatekeeper for transition legality; nothing
    /// is checked locally first. Local state changes only when the
    /// command succeeds, a failure leaves the order exactly as it was
    /// and is surfaced to the caller.
    async fn execute_action(&self, order_id: &OrderId, action: OrderAction) -> AppResult<()> {
        debug!(order_id = %order_id, action = %action, "Sending order command");
        match self.commands.send_command(order_id.clone(), action).await {
            Ok(()) => {
                self.registry
                    .apply_status_update(order_id, action.resulting_status());
                self.refresh_alert();
                Metrics::command_result(action.as_str(), "ok");
                info!(order_id = %order_id, action = %action, "Order command applied");
                Ok(())
            }
            Err(e) => {
                let outcome = match &e {
                    RegistryError::CommandRejected { .. } => "rejected",
                    _ => "failed",
                };
                Metrics::command_result(action.as_str(), outcome);
                warn!(
                    order_id = %order_id,
                    action = %action,
                    error = %e,
                    "Order command not applied"
                );
                Err(e.into())
            }
        }
    }

    /// Apply one inbound occurrence.
    pub fn dispatch(&self, event: SessionEvent) {
        match event {
            SessionEvent::NewOrder(order) => {
                Metrics::feed_event("new_order");
                let order_id = order.id.clone();
                let table = order.table_number;
                if self.registry.apply_new_order(order) {
                    info!(
                        order_id = %order_id,
                        table,
                        pending = self.registry.pending_count(),
                        "New order"
                    );
                }
                self.refresh_alert();
            }
            SessionEvent::StatusUpdate {
                order_id,
                order_status,
                table_number,
            } => {
                Metrics::feed_event("status_update");
                if self.registry.apply_status_update(&order_id, order_status) {
                    info!(
                        order_id = %order_id,
                        status = %order_status,
                        table = table_number,
                        "Order status changed remotely"
                    );
                }
                self.refresh_alert();
            }
            SessionEvent::ConnectionChanged(state) => {
                self.on_connection_changed(state);
            }
        }
    }

    /// Run the feed loop until shutdown.
    ///
    /// Spawns the feed connection, then applies socket events in
    /// arrival order. Returns after `teardown()` has completed.
    pub async fn run(&self) -> AppResult<()> {
        let mut events = self
            .events
            .lock()
            .take()
            .ok_or_else(|| AppError::Session("run() already called".to_string()))?;

        let connection = self.connection.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.connect().await {
                error!(?e, "Feed connection failed");
            }
        });
        *self.ws_task.lock() = Some(handle);

        info!("Entering order feed loop");
        let mut stats_interval = tokio::time::interval(STATS_INTERVAL);

        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_socket_event(event),
                        None => {
                            info!("Feed event channel closed");
                            break;
                        }
                    }
                }

                _ = stats_interval.tick() => {
                    self.log_stats();
                }

                _ = self.shutdown.cancelled() => {
                    info!("Session shutdown requested");
                    break;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Cleanup
        info!("Final statistics summary:");
        self.log_stats();
        self.teardown().await;

        match comanda_telemetry::gather_metrics() {
            Ok(text) => info!("Final metrics:\n{text}"),
            Err(e) => warn!(error = %e, "Failed to encode final metrics"),
        }

        Ok(())
    }

    /// Tear the session down.
    ///
    /// Stops the feed connection without arming another reconnect,
    /// stops the alert loop, and joins the connection task. Safe to
    /// call more than once.
    pub async fn teardown(&self) {
        self.shutdown.cancel();
        self.connection.shutdown();
        self.alert.teardown().await;

        let task = self.ws_task.lock().take();
        if let Some(task) = task {
            if task.await.is_err() {
                warn!("Feed connection task ended abnormally");
            }
        }
        info!("Session teardown complete");
    }

    fn handle_socket_event(&self, event: SocketEvent) {
        match event {
            SocketEvent::Frame(raw) => self.handle_frame(&raw),
            SocketEvent::StateChanged(state) => {
                self.dispatch(SessionEvent::ConnectionChanged(state));
            }
        }
    }

    /// Decode one raw frame and apply it.
    ///
    /// Malformed frames are logged and dropped; the loop keeps going.
    fn handle_frame(&self, raw: &str) {
        match self.parser.parse_frame(raw) {
            Ok(Some(event)) => self.dispatch(SessionEvent::from(event)),
            Ok(None) => Metrics::feed_dropped("unknown_type"),
            Err(e) => {
                warn!(error = %e, "Dropped malformed feed frame");
                Metrics::feed_dropped("parse_error");
            }
        }
    }

    fn on_connection_changed(&self, state: ConnectionState) {
        info!(%state, "Feed connection state changed");
        Metrics::ws_state_set(&state.to_string());
        match state {
            ConnectionState::Connected => Metrics::ws_connected(),
            ConnectionState::Reconnecting => {
                Metrics::ws_disconnected();
                Metrics::ws_reconnect();
            }
            _ => Metrics::ws_disconnected(),
        }
    }

    fn refresh_alert(&self) {
        self.alert.evaluate();
        self.update_gauges();
    }

    fn update_gauges(&self) {
        let counts = self.registry.status_counts();
        Metrics::orders_pending_set(counts.pending as i64);
        Metrics::orders_tracked_set(counts.total() as i64);
        Metrics::alert_active(self.alert.is_active());
    }

    fn log_stats(&self) {
        let counts = self.registry.status_counts();
        let payments = self.registry.payment_counts();
        info!(
            connection = %self.connection.state(),
            orders = counts.total(),
            pending = counts.pending,
            accepted = counts.accepted,
            completed = counts.completed,
            rejected = counts.rejected,
            paid = payments.paid,
            unpaid = payments.pending,
            alert_active = self.alert.is_active(),
            "Order feed statistics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertSettings;
    use chrono::Utc;
    use comanda_alert::MockAlertSink;
    use comanda_core::{OrderItem, PaymentStatus};
    use comanda_registry::{MockCommandSink, MockSnapshotSource, RegistryError};
    use rust_decimal_macros::dec;

    fn sample_order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::from(id),
            table_number: 7,
            items: vec![OrderItem {
                name: "Ramen".to_string(),
                quantity: 1,
                unit_price: dec!(12.00),
            }],
            customer_name: Some("Noor".to_string()),
            special_instructions: None,
            total_amount: dec!(12.00),
            payment_status: PaymentStatus::Paid,
            order_status: status,
            created_at: Utc::now(),
        }
    }

    struct Harness {
        session: LiveOrdersSession,
        snapshots: Arc<MockSnapshotSource>,
        commands: Arc<MockCommandSink>,
    }

    fn harness() -> Harness {
        let config = AppConfig {
            alert: AlertSettings { interval_ms: 20 },
            ..Default::default()
        };
        let snapshots = Arc::new(MockSnapshotSource::new());
        let commands = Arc::new(MockCommandSink::new());
        let sink = Arc::new(MockAlertSink::new());
        let session =
            LiveOrdersSession::new(&config, snapshots.clone(), commands.clone(), sink);
        Harness {
            session,
            snapshots,
            commands,
        }
    }

    #[test]
    fn test_session_event_from_feed_event() {
        let feed = FeedEvent::StatusUpdate {
            order_id: OrderId::from("ord-1"),
            order_status: OrderStatus::Accepted,
            table_number: 3,
        };
        assert_eq!(
            SessionEvent::from(feed),
            SessionEvent::StatusUpdate {
                order_id: OrderId::from("ord-1"),
                order_status: OrderStatus::Accepted,
                table_number: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_new_order_registers() {
        let h = harness();
        h.session
            .dispatch(SessionEvent::NewOrder(sample_order("a", OrderStatus::Pending)));

        assert_eq!(h.session.registry().len(), 1);
        assert_eq!(h.session.registry().pending_count(), 1);
        h.session.teardown().await;
    }

    #[tokio::test]
    async fn test_dispatch_duplicate_new_order_is_idempotent() {
        let h = harness();
        h.session
            .dispatch(SessionEvent::NewOrder(sample_order("a", OrderStatus::Pending)));
        h.session
            .dispatch(SessionEvent::NewOrder(sample_order("a", OrderStatus::Pending)));

        assert_eq!(h.session.registry().len(), 1);
        h.session.teardown().await;
    }

    #[tokio::test]
    async fn test_dispatch_update_for_unknown_order_is_dropped() {
        let h = harness();
        h.session.dispatch(SessionEvent::StatusUpdate {
            order_id: OrderId::from("ghost"),
            order_status: OrderStatus::Accepted,
            table_number: 1,
        });

        assert!(h.session.registry().is_empty());
        assert!(!h.session.alert_active());
        h.session.teardown().await;
    }

    #[tokio::test]
    async fn test_snapshot_failure_leaves_registry_untouched() {
        let h = harness();
        h.snapshots.queue_result(Err(RegistryError::HttpClient(
            "connection refused".to_string(),
        )));

        let result = h.session.load_snapshot().await;
        assert!(result.is_err());
        assert!(h.session.registry().is_empty());
        // One attempt only; a failed snapshot is never auto-retried.
        assert_eq!(h.snapshots.get_fetch_count(), 1);
        h.session.teardown().await;
    }

    #[tokio::test]
    async fn test_action_success_applies_locally() {
        let h = harness();
        h.snapshots
            .set_orders(vec![sample_order("a", OrderStatus::Pending)]);
        h.session.load_snapshot().await.unwrap();

        h.session.accept_order(&OrderId::from("a")).await.unwrap();

        let stored = h.session.registry().get(&OrderId::from("a")).unwrap();
        assert_eq!(stored.order_status, OrderStatus::Accepted);
        assert_eq!(
            h.commands.get_commands(),
            vec![(OrderId::from("a"), OrderAction::Accept)]
        );
        h.session.teardown().await;
    }

    #[tokio::test]
    async fn test_action_failure_leaves_order_untouched() {
        let h = harness();
        h.snapshots
            .set_orders(vec![sample_order("a", OrderStatus::Pending)]);
        h.session.load_snapshot().await.unwrap();

        h.commands.queue_result(Err(RegistryError::CommandRejected {
            reason: "Order already completed".to_string(),
        }));

        let result = h.session.reject_order(&OrderId::from("a")).await;
        assert!(matches!(
            result,
            Err(AppError::Registry(RegistryError::CommandRejected { .. }))
        ));

        let stored = h.session.registry().get(&OrderId::from("a")).unwrap();
        assert_eq!(stored.order_status, OrderStatus::Pending);
        h.session.teardown().await;
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let h = harness();
        h.session
            .handle_socket_event(SocketEvent::Frame("not json".to_string()));
        h.session.handle_socket_event(SocketEvent::Frame(
            r#"{"type": "table_session_closed", "data": {}}"#.to_string(),
        ));

        assert!(h.session.registry().is_empty());
        h.session.teardown().await;
    }

    #[tokio::test]
    async fn test_connection_change_does_not_touch_orders() {
        let h = harness();
        h.snapshots
            .set_orders(vec![sample_order("a", OrderStatus::Pending)]);
        h.session.load_snapshot().await.unwrap();

        h.session
            .dispatch(SessionEvent::ConnectionChanged(ConnectionState::Reconnecting));
        h.session
            .dispatch(SessionEvent::ConnectionChanged(ConnectionState::Connected));

        assert_eq!(h.session.registry().pending_count(), 1);
        assert!(h.session.alert_active());
        h.session.teardown().await;
    }

    #[tokio::test]
    async fn test_run_is_single_consumer() {
        let h = harness();
        h.session.teardown().await;

        // After teardown the loop exits immediately, and a second run
        // has no receiver left to consume.
        assert!(h.session.run().await.is_ok());
        let err = h.session.run().await.unwrap_err();
        assert!(matches!(err, AppError::Session(_)));
    }
}
