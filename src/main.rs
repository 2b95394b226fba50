use binance_stream::core::config::{ConfigError, FeedConfig};
use binance_stream::exchanges::binance::{BinanceFeed, BinancePayload};
use binance_stream::StreamEvent;
use serde_json::Value;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    let mut feed = BinanceFeed::new(config)?;

    let stop = feed.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping feed");
            stop.stop();
        }
    });

    feed.start(|stream: String, data: Value| async move {
        print_event(&StreamEvent::new(stream, data));
    })
    .await;

    println!("Stopped.");
    Ok(())
}

/// Reads `BINANCE_*` variables (and `.env` when enabled), defaulting to BTCUSDT at depth 5
fn load_config() -> Result<FeedConfig, ConfigError> {
    #[cfg(feature = "env-file")]
    let loaded = FeedConfig::from_env_file("BINANCE");
    #[cfg(not(feature = "env-file"))]
    let loaded = FeedConfig::from_env("BINANCE");

    match loaded {
        Ok(config) => Ok(config),
        Err(ConfigError::MissingEnvironmentVariable(var)) => {
            warn!("{} not set, subscribing to BTCUSDT", var);
            Ok(FeedConfig::new(["BTCUSDT"]).depth(5))
        }
        Err(e) => Err(e),
    }
}

fn print_event(event: &StreamEvent) {
    match BinancePayload::from_event(event) {
        Ok(BinancePayload::Trade(trade)) => {
            println!(
                "{} trade {} {} @ {}",
                event.stream, trade.id, trade.quantity, trade.price
            );
        }
        Ok(BinancePayload::Depth(depth)) => {
            let best_bid = depth.bids.first().map_or("-", |level| level[0].as_str());
            let best_ask = depth.asks.first().map_or("-", |level| level[0].as_str());
            println!(
                "{} depth #{} bid {} ask {}",
                event.stream, depth.last_update_id, best_bid, best_ask
            );
        }
        Ok(BinancePayload::Other) | Err(_) => println!("{} {}", event.stream, event.data),
    }
}
