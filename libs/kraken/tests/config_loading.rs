//! Integration tests for loading the market-maker configuration from disk.

use kraken::infrastructure::config::{ConfigError, MarketMakerConfig};
use std::io::Write;
use tempfile::NamedTempFile;

const FULL_YAML: &str = r#"
pair: "XBT/USD"

feed:
  ws_url: "wss://ws.kraken.com/"
  book_depth: 25
  staleness_window_secs: 20
  stable_session_min_secs: 60

trading:
  ws_url: "wss://ws-auth.kraken.com/"
  call_timeout_secs: 5
  max_retries: 3
  retry_delay_ms: 100

ladder:
  bid_spread_bps: 10.0
  ask_spread_bps: 10.0
  rung_increment: 5.0
  rungs_per_side: 5
  min_order: 0.0001
  max_order: 1.0

reconcile:
  min_price_change: 0.1
  min_size_change: 0.0001

cycle:
  min_price_move: 0.5
  idle_tick_secs: 2
  max_cycle_failures: 3
  restart_delay_secs: 10
  resync_secs: 30

rate_limit:
  limit: 30
  window_secs: 60

balances:
  asset_amount: 0.1
  currency_amount: 5000.0
"#;

fn write_temp(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_full_config_from_file() {
    let file = write_temp(FULL_YAML);
    let config = MarketMakerConfig::load(file.path()).unwrap();

    assert_eq!(config.pair, "XBT/USD");
    assert_eq!(config.feed.book_depth, 25);
    assert_eq!(config.feed.staleness_window_secs, 20);
    assert_eq!(config.trading.max_retries, 3);
    assert_eq!(config.ladder.rungs_per_side, 5);
    assert!((config.reconcile.min_price_change - 0.1).abs() < 1e-12);
    assert_eq!(config.cycle.max_cycle_failures, 3);
    assert_eq!(config.rate_limit.limit, 30);
    assert!((config.balances.currency_amount - 5000.0).abs() < 1e-12);
}

#[test]
fn duration_helpers_reflect_file_values() {
    use std::time::Duration;

    let file = write_temp(FULL_YAML);
    let config = MarketMakerConfig::load(file.path()).unwrap();

    assert_eq!(config.staleness_window(), Duration::from_secs(20));
    assert_eq!(config.stable_session_min(), Duration::from_secs(60));
    assert_eq!(config.call_timeout(), Duration::from_secs(5));
    assert_eq!(config.retry_delay(), Duration::from_millis(100));
    assert_eq!(config.idle_tick(), Duration::from_secs(2));
    assert_eq!(config.restart_delay(), Duration::from_secs(10));
    assert_eq!(config.resync_interval(), Duration::from_secs(30));
    assert_eq!(config.rate_window(), Duration::from_secs(60));
}

#[test]
fn missing_file_is_a_file_error() {
    let err = MarketMakerConfig::load("/nonexistent/market_maker.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::FileError(_)));
}

#[test]
fn malformed_yaml_is_a_yaml_error() {
    let file = write_temp("pair: [unterminated");
    let err = MarketMakerConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::YamlError(_)));
}

#[test]
fn zero_rungs_fails_validation() {
    let yaml = FULL_YAML.replace("rungs_per_side: 5", "rungs_per_side: 0");
    let file = write_temp(&yaml);
    let err = MarketMakerConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}
