use crate::core::errors::FeedError;
use crate::core::kernel::codec::WsCodec;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, instrument, trace, warn};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// WebSocket transport timing
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Idle heartbeat interval in milliseconds
    pub heartbeat_interval_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,    // 10 seconds
            heartbeat_interval_ms: 30_000, // 30 seconds
        }
    }
}

/// An inbound frame after transport-level handling
#[derive(Debug)]
pub enum WsFrame<M> {
    /// Data frame the codec decoded
    Data(M),
    /// Frame with nothing to act on (binary, filtered by the codec, ...)
    Ignored,
    /// Text frame the codec could not parse
    Malformed(FeedError),
    /// Remote close frame, with its reason if one was given
    Closed(Option<String>),
}

/// WebSocket session trait - pure transport layer
///
/// `connect` may be called again after `close` to open a fresh connection on
/// the same session object.
#[async_trait]
pub trait WsSession<C: WsCodec>: Send + Sync {
    /// Connect to the WebSocket
    async fn connect(&mut self) -> Result<(), FeedError>;

    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), FeedError>;

    /// Receive the next raw message; `None` once the stream has ended
    async fn next_raw(&mut self) -> Option<Result<Message, FeedError>>;

    /// Close the connection. Safe to call when already closed.
    async fn close(&mut self) -> Result<(), FeedError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;

    fn codec(&self) -> &C;

    /// Subscribe to streams using the codec
    async fn subscribe(&mut self, streams: &[String]) -> Result<(), FeedError> {
        if streams.is_empty() {
            return Ok(());
        }

        let message = self.codec().encode_subscription(streams)?;
        self.send_raw(message).await
    }

    /// Get the next frame, decoded by the codec when it carries data
    async fn next_message(&mut self) -> Option<Result<WsFrame<C::Message>, FeedError>> {
        let message = match self.next_raw().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(e)),
        };

        let frame = match message {
            Message::Close(close) => WsFrame::Closed(close.map(|c| c.reason.to_string())),
            text @ Message::Text(_) => match self.codec().decode_message(text) {
                Ok(Some(decoded)) => WsFrame::Data(decoded),
                Ok(None) => WsFrame::Ignored,
                Err(e) => WsFrame::Malformed(e),
            },
            _ => WsFrame::Ignored,
        };

        Some(Ok(frame))
    }
}

/// Tungstenite-based WebSocket implementation with ping/pong heartbeat
pub struct TungsteniteWs<C: WsCodec> {
    url: String,
    write: Option<futures_util::stream::SplitSink<WsStream, Message>>,
    read: Option<futures_util::stream::SplitStream<WsStream>>,
    connected: bool,
    feed_name: String,
    codec: C,
    config: WsConfig,
    next_heartbeat: Instant,
    awaiting_pong: bool,
}

enum Wake {
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Heartbeat,
}

impl<C: WsCodec> TungsteniteWs<C> {
    /// Create a new WebSocket session with the specified codec
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to
    /// * `feed_name` - Name of the feed for logging/tracing
    /// * `codec` - The codec to handle message encoding/decoding
    pub fn new(url: String, feed_name: String, codec: C) -> Self {
        Self {
            url,
            write: None,
            read: None,
            connected: false,
            feed_name,
            codec,
            config: WsConfig::default(),
            next_heartbeat: Instant::now(),
            awaiting_pong: false,
        }
    }

    /// Set custom WebSocket configuration
    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.config.heartbeat_interval_ms.max(1))
    }

    /// Any inbound traffic proves the peer is alive
    fn mark_alive(&mut self) {
        self.awaiting_pong = false;
        self.next_heartbeat = Instant::now() + self.heartbeat_interval();
    }

    async fn on_heartbeat(&mut self) -> Result<(), FeedError> {
        if self.awaiting_pong {
            self.connected = false;
            return Err(FeedError::ConnectionTimeout(format!(
                "no pong within {}ms heartbeat",
                self.config.heartbeat_interval_ms
            )));
        }

        trace!(feed = %self.feed_name, "Sending heartbeat ping");
        self.send_raw(Message::Ping(Vec::new())).await?;
        self.awaiting_pong = true;
        self.next_heartbeat = Instant::now() + self.heartbeat_interval();
        Ok(())
    }
}

#[async_trait]
impl<C: WsCodec> WsSession<C> for TungsteniteWs<C> {
    #[instrument(skip(self), fields(feed = %self.feed_name, url = %self.url))]
    async fn connect(&mut self) -> Result<(), FeedError> {
        if self.write.is_some() || self.read.is_some() {
            self.close().await?;
        }

        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let connection_future = tokio::time::timeout(connect_timeout, connect_async(&self.url));

        let (ws_stream, _) = connection_future
            .await
            .map_err(|_| {
                FeedError::ConnectionTimeout("WebSocket connection timeout".to_string())
            })?
            .map_err(|e| FeedError::NetworkError(format!("WebSocket connection failed: {}", e)))?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;
        self.mark_alive();

        debug!("WebSocket connected");
        Ok(())
    }

    #[instrument(skip(self, msg), fields(feed = %self.feed_name))]
    async fn send_raw(&mut self, msg: Message) -> Result<(), FeedError> {
        if !self.connected {
            return Err(FeedError::NetworkError(
                "WebSocket not connected".to_string(),
            ));
        }

        let write = self.write.as_mut().ok_or_else(|| {
            FeedError::NetworkError("WebSocket write stream not available".to_string())
        })?;

        write.send(msg).await.map_err(|e| {
            self.connected = false;
            FeedError::NetworkError(format!("Failed to send WebSocket message: {}", e))
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(feed = %self.feed_name))]
    async fn next_raw(&mut self) -> Option<Result<Message, FeedError>> {
        loop {
            if !self.connected {
                return Some(Err(FeedError::NetworkError(
                    "WebSocket not connected".to_string(),
                )));
            }

            let deadline = self.next_heartbeat;
            let wake = {
                let read = self.read.as_mut()?;
                tokio::select! {
                    message = read.next() => Wake::Frame(message),
                    () = sleep_until(deadline) => Wake::Heartbeat,
                }
            };

            let message = match wake {
                Wake::Heartbeat => {
                    if let Err(e) = self.on_heartbeat().await {
                        return Some(Err(e));
                    }
                    continue;
                }
                Wake::Frame(message) => message,
            };

            match message {
                Some(Ok(message)) => {
                    self.mark_alive();
                    // Handle control messages at transport level only
                    match message {
                        Message::Close(_) => {
                            self.connected = false;
                            return Some(Ok(message));
                        }
                        Message::Ping(data) => {
                            if let Err(e) = self.send_raw(Message::Pong(data)).await {
                                warn!("Failed to send pong response: {}", e);
                            }
                        }
                        Message::Pong(_) => {}
                        other => return Some(Ok(other)),
                    }
                }
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(FeedError::WebSocketError(e.to_string())));
                }
                None => {
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    #[instrument(skip(self), fields(feed = %self.feed_name))]
    async fn close(&mut self) -> Result<(), FeedError> {
        if let Some(mut write) = self.write.take() {
            if self.connected {
                let _ = write.send(Message::Close(None)).await;
            }
            let _ = write.close().await;
        }
        self.connected = false;
        self.read = None;
        self.awaiting_pong = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn codec(&self) -> &C {
        &self.codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::binance::codec::BinanceCodec;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn local_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    fn local_session(url: String, heartbeat_interval_ms: u64) -> TungsteniteWs<BinanceCodec> {
        TungsteniteWs::new(url, "binance".to_string(), BinanceCodec).with_config(WsConfig {
            connect_timeout_ms: 2_000,
            heartbeat_interval_ms,
        })
    }

    #[test]
    fn test_default_config() {
        let config = WsConfig::default();
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.heartbeat_interval_ms, 30_000);
    }

    #[tokio::test]
    async fn test_unconnected_session_reports_errors() {
        let mut ws = TungsteniteWs::new(
            "wss://stream.binance.com:9443/stream".to_string(),
            "binance".to_string(),
            BinanceCodec,
        );
        assert!(!ws.is_connected());
        assert!(ws.send_raw(Message::Text("{}".to_string())).await.is_err());
        assert!(matches!(ws.next_raw().await, Some(Err(_))));
        // close is idempotent
        assert!(ws.close().await.is_ok());
        assert!(ws.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let mut ws = TungsteniteWs::new(
            "ws://127.0.0.1:1/stream".to_string(),
            "binance".to_string(),
            BinanceCodec,
        )
        .with_config(WsConfig {
            connect_timeout_ms: 2_000,
            heartbeat_interval_ms: 30_000,
        });

        assert!(ws.connect().await.is_err());
        assert!(!ws.is_connected());
    }

    #[tokio::test]
    async fn test_unanswered_ping_times_out() {
        let (listener, url) = local_listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            // never read, so no pong is ever written back
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(ws);
        });

        let mut ws = local_session(url, 100);
        ws.connect().await.unwrap();
        let started = Instant::now();
        let next = tokio::time::timeout(Duration::from_secs(2), ws.next_raw())
            .await
            .expect("heartbeat should end the read");

        assert!(matches!(next, Some(Err(FeedError::ConnectionTimeout(_)))));
        // one interval to send the ping, one more to notice the missing pong
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(!ws.is_connected());
        server.abort();
    }

    #[tokio::test]
    async fn test_server_ping_is_answered_with_pong() {
        let (listener, url) = local_listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Ping(vec![7, 7])).await.unwrap();
            let reply = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text("after pong".to_string())).await.unwrap();
            reply
        });

        let mut ws = local_session(url, 30_000);
        ws.connect().await.unwrap();
        let next = tokio::time::timeout(Duration::from_secs(2), ws.next_raw())
            .await
            .unwrap();

        assert!(matches!(next, Some(Ok(Message::Text(ref text))) if text == "after pong"));
        assert_eq!(server.await.unwrap(), Message::Pong(vec![7, 7]));
    }

    #[tokio::test]
    async fn test_answered_pings_keep_session_alive() {
        let (listener, url) = local_listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let mut pings = 0;
            let send_at = tokio::time::sleep(Duration::from_millis(350));
            tokio::pin!(send_at);
            loop {
                tokio::select! {
                    message = ws.next() => match message {
                        Some(Ok(Message::Ping(_))) => pings += 1,
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                    () = &mut send_at => {
                        ws.send(Message::Text("still alive".to_string())).await.unwrap();
                        break;
                    }
                }
            }
            pings
        });

        let mut ws = local_session(url, 100);
        ws.connect().await.unwrap();
        let next = tokio::time::timeout(Duration::from_secs(2), ws.next_raw())
            .await
            .unwrap();

        assert!(matches!(next, Some(Ok(Message::Text(ref text))) if text == "still alive"));
        assert!(ws.is_connected());
        assert!(server.await.unwrap() >= 2);
    }
}
