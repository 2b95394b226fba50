pub mod core;
pub mod exchanges;

pub use crate::core::{
    config::FeedConfig,
    errors::{FeedError, SessionFailure},
    traits::{ChannelSink, EventSink},
    types::*,
};
pub use exchanges::binance::{BinanceFeed, FeedHandle, FeedState, StopHandle};
