use crate::core::types::StreamEvent;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::debug;

/// Consumer of delivered stream events.
///
/// The feed awaits `deliver` before reading the next frame, so a slow sink
/// slows the reader down instead of queueing frames without bound.
#[async_trait]
pub trait EventSink: Send {
    async fn deliver(&mut self, stream: String, data: Value);
}

#[async_trait]
impl<F, Fut> EventSink for F
where
    F: FnMut(String, Value) -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn deliver(&mut self, stream: String, data: Value) {
        (self)(stream, data).await;
    }
}

/// Hands events to a bounded channel; `deliver` waits while the channel is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end of a channel of `buffer` events
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn deliver(&mut self, stream: String, data: Value) {
        if self.tx.send(StreamEvent::new(stream, data)).await.is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}
