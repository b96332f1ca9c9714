//! Comanda live order dashboard.
//!
//! Session layer that ties all components together:
//! - Startup snapshot of the order list over REST
//! - Live order feed over WebSocket
//! - Order registry with derived counts
//! - Operator lifecycle commands (accept / reject / complete)
//! - Repeating alert while orders are pending

pub mod alert;
pub mod config;
pub mod error;
pub mod session;

pub use alert::{RegistryPendingSource, TerminalBell};
pub use comanda_registry::BackendClient;
pub use config::{AlertSettings, AppConfig, WsConfig};
pub use error::{AppError, AppResult};
pub use session::{LiveOrdersSession, SessionEvent};
