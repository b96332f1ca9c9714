//! WebSocket connector for the comanda order feed.
//!
//! Provides the persistent backend connection with:
//! - Token-authenticated connect
//! - Keep-alive probing (30s text probe while connected)
//! - Loss detection and fixed-delay reconnection (3s, indefinite)
//! - Connection-state reporting on the consumer channel
//!
//! Reconnection deliberately has no backoff growth and no retry
//! ceiling; see `ConnectionConfig::reconnect_delay_ms`.

pub mod connection;
pub mod error;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, SocketEvent};
pub use error::{WsError, WsResult};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
