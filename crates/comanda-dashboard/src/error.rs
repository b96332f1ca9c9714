//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<comanda_ws::WsError>),

    #[error("Feed error: {0}")]
    Feed(#[from] comanda_feed::FeedError),

    #[error("Registry error: {0}")]
    Registry(#[from] comanda_registry::RegistryError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] comanda_telemetry::TelemetryError),

    #[error("Session error: {0}")]
    Session(String),
}

pub type AppResult<T> = Result<T, AppError>;
