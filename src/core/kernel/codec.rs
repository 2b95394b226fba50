use crate::core::errors::FeedError;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for handling feed-specific WebSocket message encoding/decoding
///
/// This trait defines the contract for converting between raw WebSocket messages
/// and feed-specific typed messages. Each venue implements this trait to handle
/// its own subscribe request and payload envelope.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed messages from this feed
    type Message: Send + Sync;

    /// Encode a subscription request into a WebSocket message
    ///
    /// # Arguments
    /// * `streams` - The stream identifiers to subscribe to
    fn encode_subscription(&self, streams: &[String]) -> Result<Message, FeedError>;

    /// Decode a raw WebSocket message into a typed message
    ///
    /// Only data messages reach the codec. Control messages (ping, pong, close)
    /// are handled at the transport level.
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Message was ignored/filtered by codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, FeedError>;
}
