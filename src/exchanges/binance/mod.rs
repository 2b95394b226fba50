pub mod codec;
pub mod feed;
pub mod types;

// Re-export main types for easier importing
pub use codec::{build_channel_list, create_binance_stream_identifiers, BinanceCodec, BinanceMessage};
pub use feed::{BinanceFeed, FeedHandle, FeedState, StopHandle};
pub use types::{BinancePartialDepth, BinancePayload, BinanceTrade};
