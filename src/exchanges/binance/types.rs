use crate::core::errors::FeedError;
use crate::core::types::StreamEvent;
use serde::Deserialize;

// WebSocket Types
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceTrade {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub id: i64,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "T")]
    pub time: i64,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

/// Top-of-book snapshot pushed on `<symbol>@depth<levels>@100ms`
#[derive(Debug, Clone, Deserialize)]
pub struct BinancePartialDepth {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: i64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

/// Typed view of a delivered event, chosen by its channel name
#[derive(Debug, Clone)]
pub enum BinancePayload {
    Trade(BinanceTrade),
    Depth(BinancePartialDepth),
    Other,
}

impl BinancePayload {
    pub fn from_event(event: &StreamEvent) -> Result<Self, FeedError> {
        if event.stream.ends_with("@trade") {
            let trade: BinanceTrade = serde_json::from_value(event.data.clone()).map_err(|e| {
                FeedError::DeserializationError(format!("Failed to parse trade: {}", e))
            })?;
            Ok(Self::Trade(trade))
        } else if event.stream.contains("@depth") {
            let depth: BinancePartialDepth =
                serde_json::from_value(event.data.clone()).map_err(|e| {
                    FeedError::DeserializationError(format!("Failed to parse depth: {}", e))
                })?;
            Ok(Self::Depth(depth))
        } else {
            Ok(Self::Other)
        }
    }
}
