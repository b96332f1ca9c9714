//! REST client for the admin backend.
//!
//! Covers the two outbound paths: the full order snapshot fetched at
//! startup or on manual refresh, and the lifecycle commands an
//! operator issues against a single order.

use crate::backend::{BoxFuture, CommandSink, SnapshotSource};
use crate::error::{RegistryError, RegistryResult};
use comanda_core::{Order, OrderAction, OrderId};
use std::time::Duration;
use tracing::{debug, info};

/// Default HTTP request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the admin order endpoints.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl BackendClient {
    /// Create a new client for the given backend base URL.
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> RegistryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to build HTTP client: {e}")))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
        })
    }

    fn orders_url(&self) -> String {
        format!("{}/api/admin/orders", self.base_url)
    }

    fn command_url(&self, order_id: &OrderId, action: OrderAction) -> String {
        format!("{}/api/admin/orders/{order_id}/{action}", self.base_url)
    }

    /// Fetch the complete current order list.
    pub async fn fetch_orders(&self) -> RegistryResult<Vec<Order>> {
        let url = self.orders_url();
        debug!(url = %url, "Fetching order snapshot");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("Snapshot request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::HttpClient(format!(
                "Snapshot request returned HTTP {status}: {body}"
            )));
        }

        let orders: Vec<Order> = response
            .json()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("Failed to parse snapshot: {e}")))?;

        info!(count = orders.len(), "Order snapshot fetched");
        Ok(orders)
    }

    /// Deliver one lifecycle action for one order.
    ///
    /// Any non-success response is reported as `CommandRejected`, with
    /// the reason lifted out of the response body where possible.
    pub async fn send_command(
        &self,
        order_id: OrderId,
        action: OrderAction,
    ) -> RegistryResult<()> {
        let url = self.command_url(&order_id, action);
        debug!(url = %url, "Sending order command");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("Command request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::CommandRejected {
                reason: rejection_reason(status, &body),
            });
        }

        info!(order_id = %order_id, action = %action, "Order command acknowledged");
        Ok(())
    }
}

/// Extract a readable rejection reason from an error response.
///
/// Prefers the JSON `detail` field the backend returns, then the raw
/// body, then the bare status.
fn rejection_reason(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }
    if !body.trim().is_empty() {
        return format!("HTTP {status}: {body}");
    }
    format!("HTTP {status}")
}

impl SnapshotSource for BackendClient {
    fn fetch_orders(&self) -> BoxFuture<'_, RegistryResult<Vec<Order>>> {
        Box::pin(self.fetch_orders())
    }
}

impl CommandSink for BackendClient {
    fn send_command(
        &self,
        order_id: OrderId,
        action: OrderAction,
    ) -> BoxFuture<'_, RegistryResult<()>> {
        Box::pin(self.send_command(order_id, action))
    }
}
