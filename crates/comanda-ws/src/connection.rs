//! WebSocket connection manager for the order feed.
//!
//! Handles the connection lifecycle: dial, keep-alive probing, loss
//! detection, and fixed-delay reconnection. Frames are forwarded raw;
//! decoding them is the feed parser's job.

use crate::error::{WsError, WsResult};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outbound liveness probe payload. The backend treats any text as a
/// keep-alive; it never answers with data we depend on.
const PROBE_TEXT: &str = "ping";

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Feed endpoint, e.g. `wss://host/ws/orders`.
    pub url: String,
    /// Opaque auth token, appended as the `token` query parameter.
    pub auth_token: Option<String>,
    /// Fixed delay between reconnect attempts. There is no backoff
    /// growth and no retry ceiling: the dashboard is an unattended
    /// always-on screen that must eventually recover on its own.
    pub reconnect_delay_ms: u64,
    /// Interval between outbound liveness probes while connected.
    pub probe_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token: None,
            reconnect_delay_ms: 3_000,
            probe_interval_ms: 30_000,
        }
    }
}

impl ConnectionConfig {
    /// Full dial URL with the auth token attached.
    pub fn connect_url(&self) -> String {
        match self.auth_token.as_deref() {
            Some(token) if !token.is_empty() => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}token={}", self.url, sep, token)
            }
            _ => self.url.clone(),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Event delivered to the connector's consumer.
///
/// Frames and state changes share one channel so the consumer observes
/// them in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// Raw text frame received from the backend.
    Frame(String),
    /// The logical connection state changed.
    StateChanged(ConnectionState),
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    event_tx: mpsc::Sender<SocketEvent>,
    reconnect_count: Arc<RwLock<u32>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<SocketEvent>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the feed channel is currently open.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of reconnect attempts since startup.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown.
    ///
    /// Cancels the shutdown token, which makes the message loop exit
    /// promptly and prevents any further reconnect from being armed.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect to the feed and run the message loop until shutdown.
    pub async fn connect(&self) -> WsResult<()> {
        self.connect_with_retry().await
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        loop {
            // Check shutdown flag at start of loop
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                self.set_state(ConnectionState::Disconnected).await;
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting).await;

            match self.try_connect().await {
                Ok(()) => {
                    // Connection closed normally
                    info!("Order feed connection closed");
                }
                Err(e) => {
                    error!(?e, "Order feed connection error");
                }
            }

            // Check shutdown flag before arming a reconnect
            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                self.set_state(ConnectionState::Disconnected).await;
                return Ok(());
            }

            self.set_state(ConnectionState::Disconnected).await;

            let attempt = {
                let mut count = self.reconnect_count.write();
                *count += 1;
                *count
            };

            // Exactly one reconnect attempt per disconnect, after a fixed
            // delay. Unconditional and indefinite.
            let delay = Duration::from_millis(self.config.reconnect_delay_ms);
            self.set_state(ConnectionState::Reconnecting).await;
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            // Wait for delay OR shutdown signal (cancellation-aware sleep)
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during reconnect delay, exiting");
                    self.set_state(ConnectionState::Disconnected).await;
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        // The dial URL carries the token; log only the configured base.
        info!(url = %self.config.url, "Connecting to order feed");

        let (ws_stream, _response) =
            connect_async_tls_with_config(self.config.connect_url(), None, true, None).await?;
        let (mut write, mut read) = ws_stream.split();

        self.set_state(ConnectionState::Connected).await;
        info!("Order feed connected");

        // Keep-alive timer, armed for as long as this channel stays open.
        // First probe goes out one full interval after connect.
        let period = Duration::from_millis(self.config.probe_interval_ms);
        let mut probe = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        // Message loop
        loop {
            tokio::select! {
                // Shutdown signal - highest priority
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in feed loop");
                    // Send WebSocket Close frame for graceful disconnect
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    self.set_state(ConnectionState::Disconnected).await;
                    return Ok(());
                }

                // Incoming message
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.forward_frame(text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Order feed closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "Order feed read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Order feed stream ended");
                            return Ok(());
                        }
                        Some(Ok(_)) => {
                            debug!("Ignoring non-text frame");
                        }
                    }
                }

                // Liveness probe
                _ = probe.tick() => {
                    write.send(Message::Text(PROBE_TEXT.to_string())).await?;
                    debug!("Sent liveness probe");
                }
            }
        }
    }

    /// Forward a raw frame to the consumer channel.
    async fn forward_frame(&self, text: String) {
        if self.event_tx.send(SocketEvent::Frame(text)).await.is_err() {
            warn!("Feed event receiver dropped");
        }
    }

    /// Update the state cell and notify the consumer, skipping no-ops.
    async fn set_state(&self, next: ConnectionState) {
        {
            let mut state = self.state.write();
            if *state == next {
                return;
            }
            *state = next;
        }
        if self
            .event_tx
            .send(SocketEvent::StateChanged(next))
            .await
            .is_err()
        {
            warn!("Feed event receiver dropped");
        }
    }
}
