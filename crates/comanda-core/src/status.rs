//! Order lifecycle and payment status types.
//!
//! The kitchen lifecycle is a finite graph:
//! `pending → accepted → completed`, with `pending → rejected` as the
//! refusal branch. `rejected` and `completed` are terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kitchen-side order status, driven by operator actions.
///
/// Backends may omit the field on freshly created orders; it defaults
/// to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting operator action. Every new order starts here.
    #[default]
    Pending,
    /// Operator accepted; the kitchen is working on it.
    Accepted,
    /// Operator turned the order down. Terminal.
    Rejected,
    /// Served and settled. Terminal.
    Completed,
}

impl OrderStatus {
    /// Whether a direct transition to `next` is legal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Rejected)
                | (Self::Accepted, Self::Completed)
        )
    }

    /// Terminal statuses accept no further operator actions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// Operator actions legal from this status.
    ///
    /// Drives which controls the dashboard exposes. The backend still
    /// has the final say on every command.
    pub fn permitted_actions(self) -> &'static [OrderAction] {
        match self {
            Self::Pending => &[OrderAction::Accept, OrderAction::Reject],
            Self::Accepted => &[OrderAction::Complete],
            Self::Rejected | Self::Completed => &[],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Payment status, owned by the external payment subsystem.
///
/// The dashboard only reads this axis; it never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Operator command on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Accept,
    Reject,
    Complete,
}

impl OrderAction {
    /// Status an order lands in when this action succeeds.
    pub fn resulting_status(self) -> OrderStatus {
        match self {
            Self::Accept => OrderStatus::Accepted,
            Self::Reject => OrderStatus::Rejected,
            Self::Complete => OrderStatus::Completed,
        }
    }

    /// Path segment of the backend command endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
