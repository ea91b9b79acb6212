use anyhow::{Context, Result};
use kraken::execution::{ExecutionEngine, KrakenCredentials, KrakenTradingClient, StaticBalances};
use kraken::infrastructure::config::MarketMakerConfig;
use kraken::strategy::{run_supervised, MarketMaker, StrategyContext};
use kraken::types::Balances;
use kraken::{init_tracing, RateLimiter, ShutdownManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    dotenv::dotenv().ok();

    let config_path = config_path_from_env();
    let config = MarketMakerConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    config.log();

    let credentials = KrakenCredentials::from_env()
        .context("KRAKEN_API_KEY / KRAKEN_API_SECRET must be set")?;

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.spawn_signal_handler();
    let ctx = StrategyContext::new(Arc::clone(&shutdown));

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.limit,
        config.rate_window(),
        shutdown.flag(),
    ));
    let balances = Arc::new(StaticBalances::new(Balances::new(
        config.balances.asset_amount,
        config.balances.currency_amount,
    )));

    print_banner(&config.pair);

    let restart_delay = config.restart_delay();
    let result = run_supervised(
        || {
            let client = Arc::new(KrakenTradingClient::new(
                &config.trading.ws_url,
                credentials.clone(),
                config.call_timeout(),
            ));
            let engine = Arc::new(ExecutionEngine::new(
                client,
                Arc::clone(&limiter),
                &config.pair,
                config.ladder.rungs_per_side,
                kraken::execution::RetryPolicy {
                    max_retries: config.trading.max_retries,
                    retry_delay: config.retry_delay(),
                },
                shutdown.flag(),
            ));
            MarketMaker::new(config.clone(), engine, balances.clone())
        },
        &ctx,
        restart_delay,
    )
    .await;

    print_shutdown();
    result.map_err(Into::into)
}

fn config_path_from_env() -> PathBuf {
    std::env::var("MM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/market_maker.yaml"))
}

fn print_banner(pair: &str) {
    info!("");
    info!("========================================");
    info!("Starting Kraken Market Maker ({})", pair);
    info!("Press Ctrl+C to stop");
    info!("========================================");
    info!("");
}

fn print_shutdown() {
    info!("");
    info!("========================================");
    info!("Market Maker stopped gracefully");
    info!("========================================");
}
