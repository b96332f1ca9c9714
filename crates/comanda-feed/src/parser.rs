//! Feed event parsing.
//!
//! Decodes raw text frames from the order feed into typed events.
//! Frames are JSON envelopes: `{"type": <tag>, "data": <payload>}`.
//! Unknown tags are ignored for forward compatibility; payloads that
//! claim a known tag but do not decode are errors for the caller to
//! log and drop.

use crate::error::{FeedError, FeedResult};
use comanda_core::{Order, OrderId, OrderStatus};
use serde::Deserialize;
use tracing::debug;

/// Raw feed envelope. The `type` tag selects the data shape.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Raw status-update payload.
#[derive(Debug, Deserialize)]
struct RawStatusUpdate {
    order_id: String,
    /// Absent when the backend reports a freshly created order.
    #[serde(default)]
    order_status: OrderStatus,
    table_number: u32,
}

/// Parsed feed event.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A new order was placed.
    NewOrder(Order),
    /// An existing order changed status.
    StatusUpdate {
        order_id: OrderId,
        order_status: OrderStatus,
        table_number: u32,
    },
}

/// Feed message parser. Stateless.
#[derive(Debug, Default)]
pub struct EventParser;

impl EventParser {
    /// Create a new event parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse one raw text frame into a feed event.
    ///
    /// `Ok(None)` means the frame carried a tag this client does not
    /// know; newer backends may add tags and old dashboards must keep
    /// working.
    pub fn parse_frame(&self, raw: &str) -> FeedResult<Option<FeedEvent>> {
        let envelope: Envelope = serde_json::from_str(raw)?;

        match envelope.tag.as_str() {
            "new_order" => self.parse_new_order(&envelope.data).map(Some),
            "order_status_update" => self.parse_status_update(&envelope.data).map(Some),
            other => {
                debug!(tag = %other, "Unknown feed tag, ignoring");
                Ok(None)
            }
        }
    }

    fn parse_new_order(&self, data: &serde_json::Value) -> FeedResult<FeedEvent> {
        let order: Order = serde_json::from_value(data.clone())
            .map_err(|e| FeedError::ParseError(format!("Invalid new_order payload: {e}")))?;

        order
            .validate()
            .map_err(|e| FeedError::ParseError(format!("Rejected new_order payload: {e}")))?;

        Ok(FeedEvent::NewOrder(order))
    }

    fn parse_status_update(&self, data: &serde_json::Value) -> FeedResult<FeedEvent> {
        let raw: RawStatusUpdate = serde_json::from_value(data.clone()).map_err(|e| {
            FeedError::ParseError(format!("Invalid order_status_update payload: {e}"))
        })?;

        Ok(FeedEvent::StatusUpdate {
            order_id: OrderId::new(raw.order_id),
            order_status: raw.order_status,
            table_number: raw.table_number,
        })
    }
}
