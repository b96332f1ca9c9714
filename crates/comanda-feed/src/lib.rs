//! Feed event parsing for the comanda order dashboard.
//!
//! Decodes the JSON envelopes pushed over the persistent connection
//! into typed events the session dispatches.

pub mod error;
pub mod parser;

pub use error::{FeedError, FeedResult};
pub use parser::{EventParser, FeedEvent};
