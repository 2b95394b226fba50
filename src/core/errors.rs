use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

/// Why a single connect/subscribe/stream iteration of the feed ended.
///
/// Every variant is recoverable: the feed logs it and reconnects after a backoff.
#[derive(Error, Debug)]
pub enum SessionFailure {
    #[error("could not open session: {0}")]
    Connect(#[source] FeedError),

    #[error("could not send subscribe request: {0}")]
    Handshake(#[source] FeedError),

    #[error("stream failed: {0}")]
    Stream(#[source] FeedError),

    #[error("stream closed by remote ({})", .0.as_deref().unwrap_or("no reason"))]
    RemoteClosed(Option<String>),
}

impl SessionFailure {
    /// Short failure class used in log output
    pub fn class(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect failure",
            Self::Handshake(_) => "handshake failure",
            Self::Stream(_) | Self::RemoteClosed(_) => "stream error",
        }
    }
}
