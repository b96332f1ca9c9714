//! Order registry and backend access for Comanda.
//!
//! Keeps the local copy of all orders with derived aggregate counts,
//! and talks to the admin REST API for snapshots and lifecycle
//! commands. The `SnapshotSource` and `CommandSink` traits are the
//! seams the session layer depends on.

pub mod backend;
pub mod client;
pub mod error;
pub mod registry;

pub use backend::{
    BoxFuture, CommandSink, DynCommandSink, DynSnapshotSource, MockCommandSink,
    MockSnapshotSource, SnapshotSource,
};
pub use client::BackendClient;
pub use error::{RegistryError, RegistryResult};
pub use registry::{OrderRegistry, PaymentCounts, StatusCounts};
