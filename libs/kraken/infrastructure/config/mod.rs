use crate::strategy::ladder::LadderParams;
use crate::strategy::reconcile::ReconcileParams;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Market maker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarketMakerConfig {
    /// Trading pair in Kraken notation, e.g. "XBT/USD"
    pub pair: String,

    #[serde(default)]
    pub feed: FeedConfigSection,

    #[serde(default)]
    pub trading: TradingConfigSection,

    pub ladder: LadderParams,

    #[serde(default)]
    pub reconcile: ReconcileParams,

    #[serde(default)]
    pub cycle: CycleConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Fixed per-side budget quoted by the ladder
    pub balances: BalancesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfigSection {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_book_depth")]
    pub book_depth: u32,
    /// Force-close the session if no frame arrives for this long
    #[serde(default = "default_staleness_secs")]
    pub staleness_window_secs: u64,
    /// Sessions subscribed at least this long reset the reconnect backoff
    #[serde(default = "default_stable_session_secs")]
    pub stable_session_min_secs: u64,
}

impl Default for FeedConfigSection {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            book_depth: default_book_depth(),
            staleness_window_secs: default_staleness_secs(),
            stable_session_min_secs: default_stable_session_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfigSection {
    #[serde(default = "default_trading_ws_url")]
    pub ws_url: String,
    /// Bound on each outbound trading call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Additional attempts after a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for TradingConfigSection {
    fn default() -> Self {
        Self {
            ws_url: default_trading_ws_url(),
            call_timeout_secs: default_call_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CycleConfig {
    /// Reference-price move that qualifies a book update for a cycle
    #[serde(default = "default_min_price_move")]
    pub min_price_move: f64,
    /// Cycle on a timer when the feed is quiet
    #[serde(default = "default_idle_tick_secs")]
    pub idle_tick_secs: u64,
    /// Consecutive cycle failures before the loop escalates to a restart
    #[serde(default = "default_max_cycle_failures")]
    pub max_cycle_failures: u32,
    /// Delay before the supervisor restarts a crashed loop
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
    /// Interval of the open-order re-sync that picks up fills and
    /// out-of-band cancels the trading channel never reports
    #[serde(default = "default_resync_secs")]
    pub resync_secs: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_price_move: default_min_price_move(),
            idle_tick_secs: default_idle_tick_secs(),
            max_cycle_failures: default_max_cycle_failures(),
            restart_delay_secs: default_restart_delay_secs(),
            resync_secs: default_resync_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit")]
    pub limit: u32,
    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: default_rate_limit(),
            window_secs: default_rate_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BalancesConfig {
    pub asset_amount: f64,
    pub currency_amount: f64,
}

fn default_ws_url() -> String {
    "wss://ws.kraken.com/".to_string()
}
fn default_trading_ws_url() -> String {
    "wss://ws-auth.kraken.com/".to_string()
}
fn default_book_depth() -> u32 {
    10
}
fn default_staleness_secs() -> u64 {
    30
}
fn default_stable_session_secs() -> u64 {
    30
}
fn default_call_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_delay_ms() -> u64 {
    250
}
fn default_min_price_move() -> f64 {
    0.5
}
fn default_idle_tick_secs() -> u64 {
    1
}
fn default_max_cycle_failures() -> u32 {
    5
}
fn default_restart_delay_secs() -> u64 {
    5
}
fn default_resync_secs() -> u64 {
    60
}
fn default_rate_limit() -> u32 {
    60
}
fn default_rate_window_secs() -> u64 {
    60
}

impl MarketMakerConfig {
    /// Load configuration from YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let config: MarketMakerConfig = serde_yaml::from_str(&yaml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pair.is_empty() {
            return Err(ConfigError::ValidationError("pair is empty".to_string()));
        }
        if self.ladder.rungs_per_side == 0 {
            return Err(ConfigError::ValidationError(
                "ladder.rungs_per_side must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.limit == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.limit must be at least 1".to_string(),
            ));
        }
        if self.cycle.min_price_move < 0.0 {
            return Err(ConfigError::ValidationError(
                "cycle.min_price_move must not be negative".to_string(),
            ));
        }
        if self.cycle.idle_tick_secs == 0 || self.cycle.resync_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cycle intervals must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.feed.staleness_window_secs)
    }

    pub fn stable_session_min(&self) -> Duration {
        Duration::from_secs(self.feed.stable_session_min_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.trading.call_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.trading.retry_delay_ms)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_secs(self.cycle.idle_tick_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.cycle.restart_delay_secs)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.cycle.resync_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit.window_secs)
    }

    /// Log the effective configuration (no secrets live here)
    pub fn log(&self) {
        info!("[Config] pair: {}", self.pair);
        info!(
            "[Config] ladder: {} rungs/side, spreads {}/{} bps, increment {}",
            self.ladder.rungs_per_side,
            self.ladder.bid_spread_bps,
            self.ladder.ask_spread_bps,
            self.ladder.rung_increment
        );
        info!(
            "[Config] rate limit: {} requests / {}s",
            self.rate_limit.limit, self.rate_limit.window_secs
        );
        info!(
            "[Config] budget: {} asset / {} currency",
            self.balances.asset_amount, self.balances.currency_amount
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r#"
pair: "XBT/USD"
ladder:
  bid_spread_bps: 10.0
  ask_spread_bps: 10.0
  rung_increment: 5.0
  rungs_per_side: 5
  min_order: 0.001
  max_order: 100.0
balances:
  asset_amount: 1.0
  currency_amount: 50000.0
"#;

    #[test]
    fn test_minimal_yaml_with_defaults() {
        let config: MarketMakerConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
        config.validate().unwrap();
        assert_eq!(config.pair, "XBT/USD");
        assert_eq!(config.feed.ws_url, "wss://ws.kraken.com/");
        assert_eq!(config.feed.book_depth, 10);
        assert_eq!(config.cycle.idle_tick_secs, 1);
        assert_eq!(config.cycle.resync_secs, 60);
        assert_eq!(config.trading.max_retries, 2);
        assert_eq!(config.rate_limit.limit, 60);
    }

    #[test]
    fn test_overrides() {
        let yaml = format!(
            "{}\nrate_limit:\n  limit: 10\n  window_secs: 5\ncycle:\n  min_price_move: 2.5\n",
            MINIMAL_YAML
        );
        let config: MarketMakerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.rate_limit.limit, 10);
        assert_eq!(config.rate_window(), Duration::from_secs(5));
        assert_eq!(config.cycle.min_price_move, 2.5);
    }

    #[test]
    fn test_validation_rejects_empty_pair() {
        let yaml = MINIMAL_YAML.replace("\"XBT/USD\"", "\"\"");
        let config: MarketMakerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
