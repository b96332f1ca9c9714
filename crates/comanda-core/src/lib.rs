//! Core domain types for the comanda order dashboard.
//!
//! This crate provides the types shared throughout the workspace:
//! - `Order`, `OrderItem`, `OrderId`: the order model
//! - `OrderStatus`: the kitchen lifecycle and its transition graph
//! - `PaymentStatus`: the payment axis (read-only on this side)
//! - `OrderAction`: operator commands (accept / reject / complete)

pub mod error;
pub mod order;
pub mod status;

pub use error::{CoreError, Result};
pub use order::{Order, OrderId, OrderItem};
pub use status::{OrderAction, OrderStatus, PaymentStatus};
