//! In-memory order registry.
//!
//! Holds the authoritative local copy of all orders keyed by id, plus
//! aggregate counts derived from them. Every mutation recomputes the
//! counts under the same write lock, so a reader can never observe a
//! map that disagrees with its aggregates.

use comanda_core::{Order, OrderId, OrderStatus, PaymentStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Aggregate counts per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub completed: usize,
}

impl StatusCounts {
    /// Total orders across all statuses.
    pub fn total(&self) -> usize {
        self.pending + self.accepted + self.rejected + self.completed
    }

    /// Count for a single status.
    pub fn get(&self, status: OrderStatus) -> usize {
        match status {
            OrderStatus::Pending => self.pending,
            OrderStatus::Accepted => self.accepted,
            OrderStatus::Rejected => self.rejected,
            OrderStatus::Completed => self.completed,
        }
    }
}

/// Aggregate counts per payment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentCounts {
    pub pending: usize,
    pub paid: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct RegistryInner {
    orders: HashMap<OrderId, Order>,
    counts: StatusCounts,
    payment_counts: PaymentCounts,
}

impl RegistryInner {
    /// Rebuild the aggregate counts from the full map.
    fn recount(&mut self) {
        let mut counts = StatusCounts::default();
        let mut payment_counts = PaymentCounts::default();
        for order in self.orders.values() {
            match order.order_status {
                OrderStatus::Pending => counts.pending += 1,
                OrderStatus::Accepted => counts.accepted += 1,
                OrderStatus::Rejected => counts.rejected += 1,
                OrderStatus::Completed => counts.completed += 1,
            }
            match order.payment_status {
                PaymentStatus::Pending => payment_counts.pending += 1,
                PaymentStatus::Paid => payment_counts.paid += 1,
                PaymentStatus::Failed => payment_counts.failed += 1,
            }
        }
        self.counts = counts;
        self.payment_counts = payment_counts;
    }
}

/// Shared order registry.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    inner: RwLock<RegistryInner>,
}

impl OrderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire contents with a freshly fetched order list.
    pub fn load_snapshot(&self, orders: Vec<Order>) {
        let mut inner = self.inner.write();
        inner.orders = orders
            .into_iter()
            .map(|order| (order.id.clone(), order))
            .collect();
        inner.recount();
        debug!(count = inner.orders.len(), "Snapshot loaded into registry");
    }

    /// Insert a newly announced order.
    ///
    /// Duplicate announcements are ignored: if the id is already
    /// present the existing entry is kept untouched. Returns whether
    /// the order was inserted.
    pub fn apply_new_order(&self, order: Order) -> bool {
        let mut inner = self.inner.write();
        if inner.orders.contains_key(&order.id) {
            debug!(order_id = %order.id, "Duplicate new-order event ignored");
            return false;
        }
        debug!(
            order_id = %order.id,
            table = order.table_number,
            "New order registered"
        );
        inner.orders.insert(order.id.clone(), order);
        inner.recount();
        true
    }

    /// Overwrite the status of a known order.
    ///
    /// The remote side is authoritative: the new status is applied
    /// unconditionally, even when it does not follow the local
    /// lifecycle. Updates for unknown ids are dropped. Returns whether
    /// an order was updated.
    pub fn apply_status_update(&self, order_id: &OrderId, status: OrderStatus) -> bool {
        let mut inner = self.inner.write();
        let Some(order) = inner.orders.get_mut(order_id) else {
            debug!(order_id = %order_id, "Status update for unknown order dropped");
            return false;
        };
        let previous = order.order_status;
        if previous != status && !previous.can_transition_to(status) {
            debug!(
                order_id = %order_id,
                from = %previous,
                to = %status,
                "Status overwrite outside normal lifecycle"
            );
        }
        order.order_status = status;
        inner.recount();
        true
    }

    /// Number of orders currently pending.
    pub fn pending_count(&self) -> usize {
        self.inner.read().counts.pending
    }

    /// Aggregate counts for all statuses.
    pub fn status_counts(&self) -> StatusCounts {
        self.inner.read().counts
    }

    /// Aggregate counts per payment status.
    pub fn payment_counts(&self) -> PaymentCounts {
        self.inner.read().payment_counts
    }

    /// Look up a single order by id.
    pub fn get(&self, order_id: &OrderId) -> Option<Order> {
        self.inner.read().orders.get(order_id).cloned()
    }

    /// All orders, newest first.
    pub fn orders_sorted(&self) -> Vec<Order> {
        let inner = self.inner.read();
        let mut orders: Vec<Order> = inner.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Number of orders held.
    pub fn len(&self) -> usize {
        self.inner.read().orders.len()
    }

    /// Whether the registry holds no orders.
    pub fn is_empty(&self) -> bool {
        self.inner.read().orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use comanda_core::{OrderItem, PaymentStatus};
    use rust_decimal_macros::dec;

    fn sample_order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::from(id),
            table_number: 4,
            items: vec![OrderItem {
                name: "Espresso".to_string(),
                quantity: 1,
                unit_price: dec!(2.50),
            }],
            customer_name: None,
            special_instructions: None,
            total_amount: dec!(2.50),
            payment_status: PaymentStatus::default(),
            order_status: status,
            created_at: Utc::now(),
        }
    }

    fn order_at(id: &str, status: OrderStatus, secs: i64) -> Order {
        let mut order = sample_order(id, status);
        order.created_at = Utc.timestamp_opt(secs, 0).single().unwrap();
        order
    }

    #[test]
    fn test_snapshot_replaces_existing_contents() {
        let registry = OrderRegistry::new();
        registry.load_snapshot(vec![
            sample_order("a", OrderStatus::Pending),
            sample_order("b", OrderStatus::Accepted),
        ]);
        assert_eq!(registry.len(), 2);

        registry.load_snapshot(vec![sample_order("c", OrderStatus::Pending)]);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&OrderId::from("a")).is_none());
        assert!(registry.get(&OrderId::from("c")).is_some());
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn test_snapshot_counts_per_status() {
        let registry = OrderRegistry::new();
        registry.load_snapshot(vec![
            sample_order("a", OrderStatus::Pending),
            sample_order("b", OrderStatus::Pending),
            sample_order("c", OrderStatus::Accepted),
            sample_order("d", OrderStatus::Completed),
        ]);

        let counts = registry.status_counts();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.accepted, 1);
        assert_eq!(counts.rejected, 0);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.get(OrderStatus::Pending), 2);
    }

    #[test]
    fn test_snapshot_counts_per_payment_status() {
        let registry = OrderRegistry::new();
        let mut paid = sample_order("a", OrderStatus::Accepted);
        paid.payment_status = PaymentStatus::Paid;
        let mut failed = sample_order("b", OrderStatus::Pending);
        failed.payment_status = PaymentStatus::Failed;
        registry.load_snapshot(vec![paid, failed, sample_order("c", OrderStatus::Pending)]);

        let counts = registry.payment_counts();
        assert_eq!(counts.paid, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 1);
    }

    #[test]
    fn test_new_order_inserts_and_counts() {
        let registry = OrderRegistry::new();
        assert!(registry.apply_new_order(sample_order("a", OrderStatus::Pending)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn test_duplicate_new_order_keeps_existing_entry() {
        let registry = OrderRegistry::new();
        assert!(registry.apply_new_order(sample_order("a", OrderStatus::Pending)));

        let mut duplicate = sample_order("a", OrderStatus::Pending);
        duplicate.table_number = 99;
        assert!(!registry.apply_new_order(duplicate));

        assert_eq!(registry.len(), 1);
        let stored = registry.get(&OrderId::from("a")).unwrap();
        assert_eq!(stored.table_number, 4);
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn test_status_update_unknown_id_is_noop() {
        let registry = OrderRegistry::new();
        registry.load_snapshot(vec![sample_order("a", OrderStatus::Pending)]);

        let applied = registry.apply_status_update(&OrderId::from("ghost"), OrderStatus::Accepted);
        assert!(!applied);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn test_status_update_overwrites_known_order() {
        let registry = OrderRegistry::new();
        registry.load_snapshot(vec![sample_order("a", OrderStatus::Pending)]);

        assert!(registry.apply_status_update(&OrderId::from("a"), OrderStatus::Accepted));
        let counts = registry.status_counts();
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.accepted, 1);
        let stored = registry.get(&OrderId::from("a")).unwrap();
        assert_eq!(stored.order_status, OrderStatus::Accepted);
    }

    #[test]
    fn test_status_update_applies_even_outside_lifecycle() {
        let registry = OrderRegistry::new();
        registry.load_snapshot(vec![sample_order("a", OrderStatus::Completed)]);

        // Remote is authoritative even when it rewinds a terminal state.
        assert!(registry.apply_status_update(&OrderId::from("a"), OrderStatus::Pending));
        assert_eq!(registry.pending_count(), 1);
        assert_eq!(registry.status_counts().completed, 0);
    }

    #[test]
    fn test_counts_track_every_mutation() {
        let registry = OrderRegistry::new();
        assert_eq!(registry.pending_count(), 0);

        registry.apply_new_order(sample_order("a", OrderStatus::Pending));
        assert_eq!(registry.pending_count(), 1);

        registry.apply_new_order(sample_order("b", OrderStatus::Pending));
        assert_eq!(registry.pending_count(), 2);

        registry.apply_status_update(&OrderId::from("a"), OrderStatus::Rejected);
        assert_eq!(registry.pending_count(), 1);
        assert_eq!(registry.status_counts().rejected, 1);

        registry.apply_status_update(&OrderId::from("b"), OrderStatus::Accepted);
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.status_counts().accepted, 1);
    }

    #[test]
    fn test_orders_sorted_newest_first() {
        let registry = OrderRegistry::new();
        registry.load_snapshot(vec![
            order_at("old", OrderStatus::Pending, 1_000),
            order_at("newest", OrderStatus::Pending, 3_000),
            order_at("middle", OrderStatus::Pending, 2_000),
        ]);

        let sorted = registry.orders_sorted();
        let ids: Vec<&str> = sorted.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "middle", "old"]);
    }
}
