//! Integration tests for the Comanda dashboard.
//!
//! These tests verify the interaction between components:
//! - WebSocket connection lifecycle
//! - Order flow from feed frames to registry state
//! - Alert behavior across order mutations

pub mod common;
