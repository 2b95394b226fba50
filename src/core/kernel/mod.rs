/// Feed kernel - transport layer shared by venue adapters
///
/// The kernel contains no venue-specific logic, only:
///
/// - `WsSession` / `TungsteniteWs`: WebSocket connection management with heartbeat
/// - `WsCodec`: venue-specific message encoding/decoding
/// - `Backoff`: bounded exponential reconnect delay
/// - `StopSignal`: one-way latch for cooperative shutdown
///
/// ## WebSocket Integration with Codec
/// ```rust,no_run
/// use binance_stream::core::kernel::*;
/// use binance_stream::exchanges::binance::codec::BinanceCodec;
///
/// # async fn websocket_example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut ws = TungsteniteWs::new(
///     "wss://stream.binance.com:9443/stream".to_string(),
///     "binance".to_string(),
///     BinanceCodec,
/// );
/// ws.connect().await?;
/// ws.subscribe(&["btcusdt@trade".to_string()]).await?;
/// while let Some(frame) = ws.next_message().await {
///     println!("{:?}", frame?);
/// }
/// # Ok(())
/// # }
/// ```
pub mod backoff;
pub mod codec;
pub mod shutdown;
pub mod ws;

// Re-export key types for convenience
pub use backoff::Backoff;
pub use codec::WsCodec;
pub use shutdown::StopSignal;
pub use ws::{TungsteniteWs, WsConfig, WsFrame, WsSession};
