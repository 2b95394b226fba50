use crate::core::config::FeedConfig;
use crate::core::errors::{FeedError, SessionFailure};
use crate::core::kernel::{Backoff, StopSignal, TungsteniteWs, WsFrame, WsSession};
use crate::core::traits::{ChannelSink, EventSink};
use crate::core::types::StreamEvent;
use crate::exchanges::binance::codec::{build_channel_list, BinanceCodec, BinanceMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, trace, warn};

/// Lifecycle of a [`BinanceFeed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Connecting,
    Handshaking,
    Streaming,
    Backoff,
    Terminated,
}

/// Cloneable, thread-safe way to stop a running feed
#[derive(Debug, Clone)]
pub struct StopHandle {
    signal: StopSignal,
}

impl StopHandle {
    /// Ask the feed to stop. Idempotent and never blocks.
    pub fn stop(&self) {
        self.signal.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.is_stopped()
    }
}

/// Persistent subscription to Binance trade and depth streams.
///
/// Each iteration of the reconnect loop opens a session, subscribes to the
/// trade and depth channels of every symbol and forwards events to the sink
/// until the session fails or the feed is stopped. Failures of any kind are
/// retried after an exponential backoff (1s doubling up to 30s, reset after
/// every successful subscribe). The feed owns its session and backoff, so
/// independent feeds can run side by side.
///
/// ```rust,no_run
/// use binance_stream::core::config::FeedConfig;
/// use binance_stream::exchanges::binance::BinanceFeed;
/// use serde_json::Value;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut feed = BinanceFeed::new(FeedConfig::new(["BTCUSDT"]).depth(5))?;
/// let stop = feed.stop_handle();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     stop.stop();
/// });
/// feed.start(|stream: String, data: Value| async move {
///     println!("{} {}", stream, data);
/// })
/// .await;
/// # Ok(())
/// # }
/// ```
pub struct BinanceFeed<W = TungsteniteWs<BinanceCodec>> {
    symbols: Vec<String>,
    depth: u32,
    session: W,
    stop: StopSignal,
    backoff: Backoff,
    state: FeedState,
}

impl BinanceFeed<TungsteniteWs<BinanceCodec>> {
    /// Create a feed backed by a tokio-tungstenite session
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        config.validate()?;
        let session = TungsteniteWs::new(config.url.clone(), "binance".to_string(), BinanceCodec)
            .with_config(config.ws_config());
        Self::with_session(config, session)
    }
}

impl<W: WsSession<BinanceCodec>> BinanceFeed<W> {
    /// Create a feed on top of any transport session
    pub fn with_session(config: FeedConfig, session: W) -> Result<Self, FeedError> {
        config.validate()?;
        Ok(Self {
            symbols: config.symbols,
            depth: config.depth,
            session,
            stop: StopSignal::new(),
            backoff: Backoff::default(),
            state: FeedState::Idle,
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub const fn depth(&self) -> u32 {
        self.depth
    }

    pub const fn state(&self) -> FeedState {
        self.state
    }

    /// Delay the next failure will wait before reconnecting
    pub const fn current_backoff(&self) -> Duration {
        self.backoff.current()
    }

    /// Channels requested on every (re)connect, rebuilt on each call
    pub fn channel_list(&self) -> Vec<String> {
        build_channel_list(&self.symbols, self.depth)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            signal: self.stop.clone(),
        }
    }

    /// Ask the feed to stop; see [`StopHandle::stop`]
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Run the reconnect loop, delivering every event to `sink` in arrival order.
    ///
    /// Returns only after [`stop`](Self::stop) was called, with the session closed.
    pub async fn start<S: EventSink>(&mut self, mut sink: S) {
        info!(symbols = ?self.symbols, depth = self.depth, "Starting Binance feed");

        while !self.stop.is_stopped() {
            let failure = match self.run_session(&mut sink).await {
                Ok(()) => break,
                Err(failure) => failure,
            };

            self.close_session().await;
            self.transition(FeedState::Backoff);

            let delay = self.backoff.current();
            warn!(
                class = failure.class(),
                error = %failure,
                backoff_secs = delay.as_secs(),
                "Binance feed session ended, reconnecting in {}s",
                delay.as_secs()
            );

            tokio::select! {
                () = self.stop.stopped() => break,
                () = tokio::time::sleep(delay) => {}
            }
            self.backoff.advance();
        }

        self.close_session().await;
        self.transition(FeedState::Terminated);
        info!("Binance feed stopped");
    }

    /// One connect, subscribe and stream iteration.
    ///
    /// `Ok` means the stop signal was observed; every other ending is a failure.
    async fn run_session<S: EventSink>(&mut self, sink: &mut S) -> Result<(), SessionFailure> {
        self.transition(FeedState::Connecting);
        let channels = self.channel_list();
        self.session
            .connect()
            .await
            .map_err(SessionFailure::Connect)?;

        self.transition(FeedState::Handshaking);
        self.session
            .subscribe(&channels)
            .await
            .map_err(SessionFailure::Handshake)?;
        self.backoff.reset();
        info!(channels = ?channels, "Subscribed to Binance WS");

        if self.stop.is_stopped() {
            return Ok(());
        }

        self.transition(FeedState::Streaming);
        self.stream(sink).await
    }

    async fn stream<S: EventSink>(&mut self, sink: &mut S) -> Result<(), SessionFailure> {
        loop {
            let next = tokio::select! {
                biased;
                () = self.stop.stopped() => return Ok(()),
                next = self.session.next_message() => next,
            };

            if self.stop.is_stopped() {
                return Ok(());
            }

            match next {
                Some(Ok(WsFrame::Data(BinanceMessage::Event(event)))) => {
                    sink.deliver(event.stream, event.data).await;
                }
                Some(Ok(WsFrame::Data(BinanceMessage::Response { id, result }))) => {
                    debug!(?id, %result, "Request response");
                }
                Some(Ok(WsFrame::Malformed(e))) => return Err(SessionFailure::Stream(e)),
                Some(Ok(WsFrame::Ignored)) => {
                    trace!("Ignoring frame");
                }
                Some(Ok(WsFrame::Closed(reason))) => {
                    return Err(SessionFailure::RemoteClosed(reason));
                }
                Some(Err(e)) => return Err(SessionFailure::Stream(e)),
                None => return Err(SessionFailure::RemoteClosed(None)),
            }
        }
    }

    async fn close_session(&mut self) {
        if let Err(e) = self.session.close().await {
            debug!(error = %e, "Error while closing session");
        }
    }

    fn transition(&mut self, next: FeedState) {
        debug!(from = ?self.state, to = ?next, "Feed state transition");
        self.state = next;
    }
}

/// A feed running on its own task
#[derive(Debug)]
pub struct FeedHandle {
    stop: StopHandle,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the feed task to finish after a stop
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}

impl<W: WsSession<BinanceCodec> + 'static> BinanceFeed<W> {
    /// Run the feed on a new task, handing events to a channel of `buffer` slots.
    ///
    /// The feed waits for a free slot before reading the next frame.
    pub fn spawn_with_channel(mut self, buffer: usize) -> (FeedHandle, mpsc::Receiver<StreamEvent>) {
        let (sink, rx) = ChannelSink::channel(buffer);
        let stop = self.stop_handle();
        let task = tokio::spawn(async move { self.start(sink).await });
        (FeedHandle { stop, task }, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let empty: [&str; 0] = [];
        assert!(BinanceFeed::new(FeedConfig::new(empty)).is_err());
        assert!(BinanceFeed::new(FeedConfig::new(["BTCUSDT"]).depth(0)).is_err());
    }

    #[test]
    fn test_initial_state() {
        let feed = BinanceFeed::new(FeedConfig::new(["btcusdt"]).depth(5)).unwrap();
        assert_eq!(feed.state(), FeedState::Idle);
        assert_eq!(feed.symbols(), ["BTCUSDT".to_string()]);
        assert_eq!(feed.depth(), 5);
        assert_eq!(feed.current_backoff(), Duration::from_secs(1));
        assert_eq!(
            feed.channel_list(),
            vec!["btcusdt@trade", "btcusdt@depth5@100ms"]
        );
    }

    #[test]
    fn test_stop_handles_share_one_signal() {
        let feed = BinanceFeed::new(FeedConfig::new(["BTCUSDT"])).unwrap();
        let first = feed.stop_handle();
        let second = feed.stop_handle();
        assert!(!first.is_stopped());

        second.stop();
        assert!(first.is_stopped());
        assert!(feed.stop_handle().is_stopped());
    }

    #[tokio::test]
    async fn test_stop_before_start_returns_immediately() {
        let mut feed = BinanceFeed::new(FeedConfig::new(["BTCUSDT"])).unwrap();
        feed.stop();
        feed.stop();

        tokio::time::timeout(
            Duration::from_secs(1),
            feed.start(|_: String, _: serde_json::Value| async {}),
        )
        .await
        .expect("start should return once stopped");
        assert_eq!(feed.state(), FeedState::Terminated);
    }
}
