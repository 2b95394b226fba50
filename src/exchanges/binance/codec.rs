use crate::core::errors::FeedError;
use crate::core::kernel::WsCodec;
use crate::core::types::{StreamEvent, SubscriptionType};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

/// Request id sent with every subscribe request
pub const SUBSCRIBE_REQUEST_ID: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum BinanceMessage {
    /// Combined-stream envelope carrying both `stream` and `data`
    Event(StreamEvent),
    /// Subscription acknowledgement or error reply to a request
    Response { id: Option<u64>, result: Value },
}

pub struct BinanceCodec;

impl WsCodec for BinanceCodec {
    type Message = BinanceMessage;

    fn encode_subscription(&self, streams: &[String]) -> Result<Message, FeedError> {
        let subscription = json!({
            "method": "SUBSCRIBE",
            "params": streams,
            "id": SUBSCRIBE_REQUEST_ID
        });
        Ok(Message::Text(subscription.to_string()))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, FeedError> {
        let text = match message {
            Message::Text(text) => text,
            _ => return Ok(None), // Ignore other message types
        };
        let mut value: Value = serde_json::from_str(&text).map_err(|e| {
            FeedError::DeserializationError(format!("Failed to parse JSON: {}", e))
        })?;

        let Some(object) = value.as_object_mut() else {
            return Ok(None);
        };

        // Handle combined stream format; a non-string `stream` is not a stream event
        if let Some(stream) = object.get("stream").and_then(|s| s.as_str()) {
            let stream = stream.to_string();
            return Ok(object
                .remove("data")
                .map(|data| BinanceMessage::Event(StreamEvent::new(stream, data))));
        }

        // Handle subscription confirmations and errors
        if object.contains_key("result") || object.contains_key("error") {
            let id = object.get("id").and_then(Value::as_u64);
            let result = object
                .remove("error")
                .or_else(|| object.remove("result"))
                .unwrap_or(Value::Null);
            return Ok(Some(BinanceMessage::Response { id, result }));
        }

        Ok(None)
    }
}

/// Create Binance stream identifiers for WebSocket subscriptions
///
/// Symbols are lowercased; for each symbol one identifier per subscription type
/// is emitted, in the order given.
pub fn create_binance_stream_identifiers(
    symbols: &[String],
    subscription_types: &[SubscriptionType],
) -> Vec<String> {
    let mut streams = Vec::with_capacity(symbols.len() * subscription_types.len());

    for symbol in symbols {
        let lower_symbol = symbol.to_lowercase();
        for sub_type in subscription_types {
            match sub_type {
                SubscriptionType::OrderBook { depth } => {
                    if let Some(d) = depth {
                        streams.push(format!("{}@depth{}@100ms", lower_symbol, d));
                    } else {
                        streams.push(format!("{}@depth@100ms", lower_symbol));
                    }
                }
                SubscriptionType::Trades => {
                    streams.push(format!("{}@trade", lower_symbol));
                }
            }
        }
    }

    streams
}

/// Trade channel followed by the `depth`-level snapshot channel, per symbol
pub fn build_channel_list(symbols: &[String], depth: u32) -> Vec<String> {
    create_binance_stream_identifiers(
        symbols,
        &[
            SubscriptionType::Trades,
            SubscriptionType::OrderBook { depth: Some(depth) },
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_symbol_channel_list() {
        let channels = build_channel_list(&symbols(&["BTCUSDT"]), 5);
        assert_eq!(channels, vec!["btcusdt@trade", "btcusdt@depth5@100ms"]);
    }

    #[test]
    fn test_channel_list_preserves_symbol_order() {
        let channels = build_channel_list(&symbols(&["ETHUSDT", "BTCUSDT", "BNBBTC"]), 20);
        assert_eq!(
            channels,
            vec![
                "ethusdt@trade",
                "ethusdt@depth20@100ms",
                "btcusdt@trade",
                "btcusdt@depth20@100ms",
                "bnbbtc@trade",
                "bnbbtc@depth20@100ms",
            ]
        );
    }

    #[test]
    fn test_channel_list_is_twice_symbol_count() {
        for n in 1..=12 {
            let list: Vec<String> = (0..n).map(|i| format!("SYM{}USDT", i)).collect();
            let channels = build_channel_list(&list, 10);
            assert_eq!(channels.len(), 2 * n);
            for (i, pair) in channels.chunks(2).enumerate() {
                let lower = list[i].to_lowercase();
                assert_eq!(pair[0], format!("{}@trade", lower));
                assert_eq!(pair[1], format!("{}@depth10@100ms", lower));
            }
        }
    }

    #[test]
    fn test_diff_depth_identifier() {
        let channels = create_binance_stream_identifiers(
            &symbols(&["BTCUSDT"]),
            &[SubscriptionType::OrderBook { depth: None }],
        );
        assert_eq!(channels, vec!["btcusdt@depth@100ms"]);
    }

    #[test]
    fn test_encode_subscription() {
        let message = BinanceCodec
            .encode_subscription(&symbols(&["btcusdt@trade", "btcusdt@depth5@100ms"]))
            .unwrap();
        let Message::Text(text) = message else {
            panic!("expected text frame");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "method": "SUBSCRIBE",
                "params": ["btcusdt@trade", "btcusdt@depth5@100ms"],
                "id": 1
            })
        );
    }

    #[test]
    fn test_decode_combined_stream_event() {
        let text = r#"{"stream":"btcusdt@trade","data":{"e":"trade","s":"BTCUSDT","p":"50000.01"}}"#;
        let decoded = BinanceCodec
            .decode_message(Message::Text(text.to_string()))
            .unwrap();
        assert_eq!(
            decoded,
            Some(BinanceMessage::Event(StreamEvent::new(
                "btcusdt@trade",
                json!({"e": "trade", "s": "BTCUSDT", "p": "50000.01"})
            )))
        );
    }

    #[test]
    fn test_decode_missing_fields_is_ignored() {
        let no_data = r#"{"stream":"btcusdt@trade"}"#;
        let no_stream = r#"{"data":{"p":"1"}}"#;
        let not_object = r#"[1,2,3]"#;

        for text in [no_data, no_stream, not_object] {
            let decoded = BinanceCodec
                .decode_message(Message::Text(text.to_string()))
                .unwrap();
            assert_eq!(decoded, None, "{} should be ignored", text);
        }
    }

    #[test]
    fn test_decode_subscription_ack() {
        let decoded = BinanceCodec
            .decode_message(Message::Text(r#"{"result":null,"id":1}"#.to_string()))
            .unwrap();
        assert_eq!(
            decoded,
            Some(BinanceMessage::Response {
                id: Some(1),
                result: Value::Null
            })
        );
    }

    #[test]
    fn test_decode_invalid_json_is_an_error() {
        let result = BinanceCodec.decode_message(Message::Text("{not json".to_string()));
        assert!(matches!(result, Err(FeedError::DeserializationError(_))));
    }

    #[test]
    fn test_decode_ignores_binary() {
        let decoded = BinanceCodec
            .decode_message(Message::Binary(b"{}".to_vec()))
            .unwrap();
        assert_eq!(decoded, None);
    }
}
