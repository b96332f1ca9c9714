//! The order model shared across the workspace.
//!
//! Orders arrive from two places with the same shape: the snapshot
//! endpoint (bulk) and `new_order` feed events (single). Wire payloads
//! may carry fields this model does not know about; they are ignored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::status::{OrderStatus, PaymentStatus};

/// Backend-assigned order identifier.
///
/// Opaque to the client. The backend happens to issue UUIDs, but
/// nothing on this side depends on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderItem {
    /// Line total: unit price times quantity.
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A customer's submitted order, tied to a table.
///
/// `order_status` defaults to `pending` when the backend omits it on a
/// payload; everything else is immutable once created. Only the
/// registry mutates `order_status`, and only through the lifecycle
/// graph in [`crate::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub table_number: u32,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Free-text kitchen notes entered by the customer.
    #[serde(default)]
    pub special_instructions: Option<String>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether this order still awaits operator action.
    pub fn is_pending(&self) -> bool {
        self.order_status == OrderStatus::Pending
    }

    /// Check the field constraints a well-formed order satisfies.
    ///
    /// Ingestion paths treat a failure here the same as a malformed
    /// payload: log and drop, never apply.
    pub fn validate(&self) -> Result<()> {
        if self.table_number == 0 {
            return Err(CoreError::InvalidTableNumber(self.table_number));
        }
        if self.total_amount < Decimal::ZERO {
            return Err(CoreError::InvalidAmount(self.total_amount));
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(CoreError::InvalidQuantity {
                    name: item.name.clone(),
                    quantity: item.quantity,
                });
            }
        }
        Ok(())
    }
}
