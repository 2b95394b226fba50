use crate::core::kernel::ws::WsConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::env;

/// Standard combined-stream endpoint for Binance spot market data
pub const DEFAULT_WS_URL: &str = "wss://stream.binance.com:9443/stream";

/// Default number of order book levels per depth snapshot
pub const DEFAULT_DEPTH: u32 = 10;

const DEFAULT_HEARTBEAT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct FeedConfig {
    /// Instrument identifiers, always stored uppercase
    pub symbols: Vec<String>,
    pub depth: u32,
    pub url: String,
    pub heartbeat_interval_secs: u64,
    pub connect_timeout_secs: u64,
}

// Symbols are normalized on the way in, whichever way the config was built
impl<'de> Deserialize<'de> for FeedConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct FeedConfigHelper {
            symbols: Vec<String>,
            #[serde(default = "default_depth")]
            depth: u32,
            #[serde(default = "default_url")]
            url: String,
            #[serde(default = "default_heartbeat_secs")]
            heartbeat_interval_secs: u64,
            #[serde(default = "default_connect_timeout_secs")]
            connect_timeout_secs: u64,
        }

        let helper = FeedConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            symbols: normalize_symbols(helper.symbols),
            depth: helper.depth,
            url: helper.url,
            heartbeat_interval_secs: helper.heartbeat_interval_secs,
            connect_timeout_secs: helper.connect_timeout_secs,
        })
    }
}

fn default_depth() -> u32 {
    DEFAULT_DEPTH
}

fn default_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_heartbeat_secs() -> u64 {
    DEFAULT_HEARTBEAT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .collect()
}

impl FeedConfig {
    /// Create a configuration for the given symbols with default depth and endpoint
    #[must_use]
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: normalize_symbols(symbols),
            depth: DEFAULT_DEPTH,
            url: DEFAULT_WS_URL.to_string(),
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_SYMBOLS` (comma separated, e.g. `BTCUSDT,ETHUSDT`)
    /// - `{PREFIX}_DEPTH` (optional, defaults to 10)
    /// - `{PREFIX}_WS_URL` (optional)
    /// - `{PREFIX}_HEARTBEAT_SECS` (optional, defaults to 30)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let symbols_var = format!("{}_SYMBOLS", prefix);
        let depth_var = format!("{}_DEPTH", prefix);
        let url_var = format!("{}_WS_URL", prefix);
        let heartbeat_var = format!("{}_HEARTBEAT_SECS", prefix);

        let symbols = env::var(&symbols_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(symbols_var))?;
        let symbols: Vec<&str> = symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let mut config = Self::new(symbols);

        if let Ok(depth) = env::var(&depth_var) {
            config.depth = depth.trim().parse::<u32>().map_err(|e| {
                ConfigError::InvalidConfiguration(format!("{}='{}': {}", depth_var, depth, e))
            })?;
        }

        if let Ok(url) = env::var(&url_var) {
            config.url = url;
        }

        if let Ok(secs) = env::var(&heartbeat_var) {
            config.heartbeat_interval_secs = secs.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidConfiguration(format!("{}='{}': {}", heartbeat_var, secs, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from .env file and environment variables
    ///
    /// Variables already present in the process environment take precedence
    /// over the ones in the file.
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // no file, fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Set the number of depth levels per snapshot
    #[must_use]
    pub const fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Set a custom WebSocket endpoint
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the idle heartbeat interval in seconds
    #[must_use]
    pub const fn heartbeat_interval_secs(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = secs;
        self
    }

    /// Set the connect timeout in seconds
    #[must_use]
    pub const fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "at least one symbol is required".to_string(),
            ));
        }
        if let Some(pos) = self.symbols.iter().position(|s| s.is_empty()) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "symbol at position {} is empty",
                pos
            )));
        }
        if self.depth == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "depth must be a positive integer".to_string(),
            ));
        }
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "url must use ws:// or wss://, got '{}'",
                self.url
            )));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "heartbeat interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Transport timing derived from this configuration
    pub fn ws_config(&self) -> WsConfig {
        WsConfig {
            connect_timeout_ms: self.connect_timeout_secs.saturating_mul(1_000),
            heartbeat_interval_ms: self.heartbeat_interval_secs.saturating_mul(1_000),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
