use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of market data channel a feed can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionType {
    Trades,
    /// Partial book snapshots of `depth` levels, or the diff stream when `None`
    OrderBook { depth: Option<u32> },
}

/// One event as delivered by the remote service: the channel it arrived on
/// and its raw payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub stream: String,
    pub data: Value,
}

impl StreamEvent {
    pub fn new(stream: impl Into<String>, data: Value) -> Self {
        Self {
            stream: stream.into(),
            data,
        }
    }
}
