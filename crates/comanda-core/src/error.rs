//! Error types for comanda-core.

use rust_decimal::Decimal;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid table number: {0}")]
    InvalidTableNumber(u32),

    #[error("Invalid total amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Invalid quantity for item '{name}': {quantity}")]
    InvalidQuantity { name: String, quantity: u32 },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
