//! Alert signaling for pending orders.
//!
//! Runs a repeating pulse for as long as any order is pending, so an
//! unattended terminal stays audible until someone acts.
//!
//! # Key Components
//!
//! - [`AlertEngine`]: Owns the pulse loop, restartable and idempotent
//! - [`AlertSink`]: Trait for the signal output
//! - [`PendingSource`]: Trait for the live pending-order count
//! - [`AlertConfig`]: Pulse cadence configuration

pub mod engine;

pub use engine::{
    AlertConfig, AlertEngine, AlertSink, DynAlertSink, DynPendingSource, MockAlertSink,
    MockPendingSource, PendingSource, ALERT_INTERVAL_MS,
};
