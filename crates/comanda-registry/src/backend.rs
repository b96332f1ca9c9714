//! Backend access seams.
//!
//! The session reaches the backend through these traits so tests can
//! substitute in-process doubles for the REST client.

use crate::error::RegistryResult;
use comanda_core::{Order, OrderAction, OrderId};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Source of full order snapshots.
pub trait SnapshotSource: Send + Sync {
    /// Fetch the complete current order list.
    fn fetch_orders(&self) -> BoxFuture<'_, RegistryResult<Vec<Order>>>;
}

/// Sink for operator lifecycle commands.
pub trait CommandSink: Send + Sync {
    /// Deliver one lifecycle action for one order.
    fn send_command(
        &self,
        order_id: OrderId,
        action: OrderAction,
    ) -> BoxFuture<'_, RegistryResult<()>>;
}

/// Arc wrapper for SnapshotSource trait objects.
pub type DynSnapshotSource = Arc<dyn SnapshotSource>;

/// Arc wrapper for CommandSink trait objects.
pub type DynCommandSink = Arc<dyn CommandSink>;

/// Mock snapshot source for testing.
///
/// Answers with queued one-shot results first, then with the default
/// order list. Records how many fetches were made.
pub struct MockSnapshotSource {
    orders: parking_lot::Mutex<Vec<Order>>,
    queued: parking_lot::Mutex<VecDeque<RegistryResult<Vec<Order>>>>,
    fetches: std::sync::atomic::AtomicUsize,
}

impl MockSnapshotSource {
    /// Create a mock that returns an empty order list.
    pub fn new() -> Self {
        Self {
            orders: parking_lot::Mutex::new(Vec::new()),
            queued: parking_lot::Mutex::new(VecDeque::new()),
            fetches: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock that returns the given orders.
    pub fn with_orders(orders: Vec<Order>) -> Self {
        let mock = Self::new();
        *mock.orders.lock() = orders;
        mock
    }

    /// Replace the default order list.
    pub fn set_orders(&self, orders: Vec<Order>) {
        *self.orders.lock() = orders;
    }

    /// Queue a one-shot result returned ahead of the default list.
    pub fn queue_result(&self, result: RegistryResult<Vec<Order>>) {
        self.queued.lock().push_back(result);
    }

    /// Number of fetches made so far.
    pub fn get_fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for MockSnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for MockSnapshotSource {
    fn fetch_orders(&self) -> BoxFuture<'_, RegistryResult<Vec<Order>>> {
        Box::pin(async move {
            self.fetches
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if let Some(result) = self.queued.lock().pop_front() {
                return result;
            }
            Ok(self.orders.lock().clone())
        })
    }
}

/// Mock command sink for testing.
///
/// Records every command and answers with queued one-shot results,
/// succeeding by default.
pub struct MockCommandSink {
    commands: parking_lot::Mutex<Vec<(OrderId, OrderAction)>>,
    queued: parking_lot::Mutex<VecDeque<RegistryResult<()>>>,
}

impl MockCommandSink {
    /// Create a mock that acknowledges every command.
    pub fn new() -> Self {
        Self {
            commands: parking_lot::Mutex::new(Vec::new()),
            queued: parking_lot::Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a one-shot result for the next command.
    pub fn queue_result(&self, result: RegistryResult<()>) {
        self.queued.lock().push_back(result);
    }

    /// Get recorded commands.
    pub fn get_commands(&self) -> Vec<(OrderId, OrderAction)> {
        self.commands.lock().clone()
    }

    /// Clear recorded commands.
    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }
}

impl Default for MockCommandSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSink for MockCommandSink {
    fn send_command(
        &self,
        order_id: OrderId,
        action: OrderAction,
    ) -> BoxFuture<'_, RegistryResult<()>> {
        Box::pin(async move {
            self.commands.lock().push((order_id, action));
            self.queued.lock().pop_front().unwrap_or(Ok(()))
        })
    }
}
