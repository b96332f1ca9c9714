//! Application configuration.

use crate::error::{AppError, AppResult};
use comanda_alert::{AlertConfig, ALERT_INTERVAL_MS};
use comanda_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend REST base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Backend WebSocket base URL. The `/ws/orders` path is appended.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Admin API token. The COMANDA_ADMIN_TOKEN environment variable
    /// takes precedence over this value.
    #[serde(default)]
    pub admin_token: String,
    /// WebSocket configuration.
    #[serde(default)]
    pub websocket: WsConfig,
    /// Alert configuration.
    #[serde(default)]
    pub alert: AlertSettings,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:8000".to_string()
}

/// WebSocket configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Fixed delay between reconnect attempts (ms).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Liveness probe interval (ms).
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_probe_interval_ms() -> u64 {
    30_000
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            probe_interval_ms: default_probe_interval_ms(),
        }
    }
}

impl From<WsConfig> for ConnectionConfig {
    fn from(cfg: WsConfig) -> Self {
        Self {
            url: String::new(), // Set separately
            auth_token: None,   // Set separately
            reconnect_delay_ms: cfg.reconnect_delay_ms,
            probe_interval_ms: cfg.probe_interval_ms,
        }
    }
}

/// Alert configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    /// Interval between alert pulses while orders are pending (ms).
    #[serde(default = "default_alert_interval_ms")]
    pub interval_ms: u64,
}

fn default_alert_interval_ms() -> u64 {
    ALERT_INTERVAL_MS
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_alert_interval_ms(),
        }
    }
}

impl From<AlertSettings> for AlertConfig {
    fn from(cfg: AlertSettings) -> Self {
        AlertConfig::new(cfg.interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from file.
    pub fn load() -> AppResult<Self> {
        // Try to load from config file
        let config_path =
            std::env::var("COMANDA_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Admin token with the environment override applied.
    ///
    /// The token is a secret and must never be logged.
    pub fn auth_token(&self) -> String {
        std::env::var("COMANDA_ADMIN_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.admin_token.clone())
    }

    /// Full order feed endpoint.
    pub fn feed_url(&self) -> String {
        format!("{}/ws/orders", self.ws_url.trim_end_matches('/'))
    }

    /// Connection configuration for the order feed.
    pub fn connection_config(&self) -> ConnectionConfig {
        let mut cfg = ConnectionConfig::from(self.websocket.clone());
        cfg.url = self.feed_url();
        let token = self.auth_token();
        if !token.is_empty() {
            cfg.auth_token = Some(token);
        }
        cfg
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            admin_token: String::new(),
            websocket: WsConfig::default(),
            alert: AlertSettings::default(),
        }
    }
}
