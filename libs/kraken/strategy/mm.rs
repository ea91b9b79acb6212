//! Ladder market-making strategy.
//!
//! Drives the reconciliation cycle: consume market events, regenerate the
//! desired ladder on every qualifying reference-price move (or an idle
//! timer tick), diff it against the live order set, and hand the resulting
//! operations to the execution engine. Cycles never overlap; the next event
//! is processed only after the previous cycle completed.

use crate::execution::{AccountClient, BalanceProvider, ExecutionEngine};
use crate::feed::{book_subscription, trade_subscription, KrakenFrameDecoder, MarketEvent};
use crate::infrastructure::config::MarketMakerConfig;
use crate::strategy::ladder::{build_ladder, generate_positions};
use crate::strategy::reconcile::reconcile;
use crate::strategy::traits::{
    LoopState, StatusReport, Strategy, StrategyContext, StrategyError, StrategyResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedline::{FeedClient, FeedConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Interval of the status heartbeat log line
const STATUS_HEARTBEAT: Duration = Duration::from_secs(60);

/// Lock-free holder for the loop state
struct AtomicLoopState {
    state: AtomicU8,
}

impl AtomicLoopState {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(LoopState::Idle as u8),
        }
    }

    fn get(&self) -> LoopState {
        match self.state.load(Ordering::Acquire) {
            1 => LoopState::Running,
            2 => LoopState::Stopping,
            3 => LoopState::Crashed,
            _ => LoopState::Idle,
        }
    }

    fn set(&self, state: LoopState) {
        let value = match state {
            LoopState::Idle => 0,
            LoopState::Running => 1,
            LoopState::Stopping => 2,
            LoopState::Crashed => 3,
        };
        self.state.store(value, Ordering::Release);
    }
}

/// Top-of-book tracker feeding the reference price.
#[derive(Debug, Default, Clone, Copy)]
struct TopOfBook {
    best_bid: Option<f64>,
    best_ask: Option<f64>,
}

impl TopOfBook {
    fn update(&mut self, bid: Option<f64>, ask: Option<f64>) {
        if bid.is_some() {
            self.best_bid = bid;
        }
        if ask.is_some() {
            self.best_ask = ask;
        }
    }

    fn mid(&self) -> Option<f64> {
        match (self.best_bid, self.best_ask) {
            (Some(b), Some(a)) => Some((b + a) / 2.0),
            _ => None,
        }
    }
}

/// Decides which references get quoted.
///
/// A book update qualifies when the mid moved at least `min_price_move`
/// from the last quoted reference (or nothing was quoted yet). A timer
/// tick qualifies only when the loop stayed quiet for a full `idle_after`
/// since the last cycle; ticks never undercut the price-move gate while
/// cycles are flowing.
struct CycleGate {
    min_price_move: f64,
    idle_after: Duration,
    last_quoted_ref: Option<f64>,
    last_cycle_at: Option<Instant>,
}

impl CycleGate {
    fn new(min_price_move: f64, idle_after: Duration) -> Self {
        Self {
            min_price_move,
            idle_after,
            last_quoted_ref: None,
            last_cycle_at: None,
        }
    }

    fn qualify_book(&self, mid: Option<f64>) -> Option<f64> {
        let mid = mid?;
        match self.last_quoted_ref {
            Some(prev) if (mid - prev).abs() < self.min_price_move => None,
            _ => Some(mid),
        }
    }

    fn qualify_tick(&self, mid: Option<f64>, now: Instant) -> Option<f64> {
        let mid = mid?;
        match self.last_cycle_at {
            Some(at) if now.duration_since(at) < self.idle_after => None,
            _ => Some(mid),
        }
    }

    fn record_cycle(&mut self, reference: f64, now: Instant) {
        self.last_quoted_ref = Some(reference);
        self.last_cycle_at = Some(now);
    }
}

/// Ladder market maker for one pair.
pub struct MarketMaker<C: AccountClient + 'static> {
    config: MarketMakerConfig,
    engine: Arc<ExecutionEngine<C>>,
    balances: Arc<dyn BalanceProvider>,
    state: Arc<AtomicLoopState>,
    /// Per-instance run flag: shared with the feed session, dropped by
    /// `stop()` and on loop exit. Distinct from the process-wide shutdown
    /// flag so one crashing instance never tears down its successor.
    active: Arc<AtomicBool>,
    last_cycle: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl<C: AccountClient + 'static> MarketMaker<C> {
    pub fn new(
        config: MarketMakerConfig,
        engine: Arc<ExecutionEngine<C>>,
        balances: Arc<dyn BalanceProvider>,
    ) -> Self {
        Self {
            config,
            engine,
            balances,
            state: Arc::new(AtomicLoopState::new()),
            active: Arc::new(AtomicBool::new(true)),
            last_cycle: Arc::new(Mutex::new(None)),
        }
    }

    fn feed_config(&self) -> FeedConfig {
        FeedConfig::new(&self.config.feed.ws_url)
            .with_subscription(book_subscription(&self.config.pair, self.config.feed.book_depth))
            .with_subscription(trade_subscription(&self.config.pair))
            .with_staleness_window(self.config.staleness_window())
            .with_stable_session_min(self.config.stable_session_min())
            .with_shutdown_flag(Arc::clone(&self.active))
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// One reconciliation cycle end-to-end.
    async fn run_cycle(&self, reference: f64) -> StrategyResult<()> {
        self.engine.live_orders().write().purge_terminal();

        let balances = self.balances.get_balance().await?;
        let (buy_size, sell_size) = generate_positions(
            reference,
            balances.asset_amount,
            balances.currency_amount,
            &self.config.ladder,
        )?;
        let ladder = build_ladder(reference, buy_size, sell_size, &self.config.ladder)?;

        let live = self.engine.live_orders().read().snapshot();
        let ops = reconcile(&live, &ladder, &self.config.reconcile);
        if ops.is_empty() {
            return Ok(());
        }

        debug!(
            "[MM] Cycle at ref {:.2}: {} ops ({} live orders)",
            reference,
            ops.len(),
            live.len()
        );
        let report = self.engine.apply(ops).await;
        if !report.fully_converged() {
            // degraded, not fatal; status() shows the shortfall
            warn!(
                "[MM] Partial convergence: {}/{} ops succeeded ({} rejected, {} failed, {} skipped)",
                report.succeeded, report.attempted, report.rejected, report.failed, report.skipped
            );
        }

        *self.last_cycle.lock() = Some(Utc::now());
        Ok(())
    }

    /// Best-effort teardown: cancel everything still resting.
    async fn shutdown_cleanup(&self) {
        self.state.set(LoopState::Stopping);
        let (bids, asks) = self.engine.open_counts();
        if bids + asks > 0 {
            info!("[MM] Canceling {} live orders on shutdown", bids + asks);
            self.engine.cancel_all().await;
        }
        self.state.set(LoopState::Idle);
    }
}

#[async_trait]
impl<C: AccountClient + 'static> Strategy for MarketMaker<C> {
    fn name(&self) -> &str {
        "ladder-mm"
    }

    fn description(&self) -> &str {
        "Maintains a two-sided ladder of resting limit orders around the mid price"
    }

    /// Rebuild the live set from the venue; never assume an empty book.
    async fn initialize(&mut self, _ctx: &StrategyContext) -> StrategyResult<()> {
        self.engine.sync_open_orders().await?;
        let (bids, asks) = self.engine.open_counts();
        info!("[MM] Startup sync found {} bids / {} asks resting", bids, asks);
        Ok(())
    }

    async fn start(&mut self, ctx: &StrategyContext) -> StrategyResult<()> {
        self.state.set(LoopState::Running);
        info!("[MM] Starting for {}", self.config.pair);

        let decoder = KrakenFrameDecoder::new(&self.config.pair);
        let mut feed = FeedClient::new(self.feed_config(), decoder);
        let mut events = match feed.events() {
            Some(rx) => rx,
            None => {
                self.state.set(LoopState::Crashed);
                return Err(StrategyError::Config(
                    "feed event stream already taken".to_string(),
                ));
            }
        };
        let feed_task = tokio::spawn(async move { feed.run().await });

        let mut book = TopOfBook::default();
        let mut gate = CycleGate::new(self.config.cycle.min_price_move, self.config.idle_tick());
        let mut consecutive_failures: u32 = 0;
        let mut idle_tick = tokio::time::interval(self.config.idle_tick());
        idle_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut status_tick = tokio::time::interval(STATUS_HEARTBEAT);
        status_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // fills and out-of-band cancels surface only here, so the first
        // re-sync waits a full interval instead of firing immediately
        let resync_interval = self.config.resync_interval();
        let mut resync_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + resync_interval,
            resync_interval,
        );
        resync_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let outcome = loop {
            if !ctx.is_running() || !self.is_active() {
                break Ok(());
            }

            // A qualifying event starts a full cycle before the next event
            // is read; cycles for one pair never overlap.
            let reference = tokio::select! {
                event = events.recv() => match event {
                    Some(MarketEvent::BookUpdate { best_bid, best_ask }) => {
                        book.update(best_bid, best_ask);
                        gate.qualify_book(book.mid())
                    }
                    Some(MarketEvent::Trade { price, .. }) => {
                        debug!("[MM] Trade printed at {}", price);
                        None
                    }
                    Some(MarketEvent::Heartbeat) => None,
                    Some(MarketEvent::SystemStatus { status }) => {
                        info!("[MM] Venue system status: {}", status);
                        None
                    }
                    Some(MarketEvent::SubscriptionAck { channel }) => {
                        info!("[MM] Subscribed to {}", channel);
                        None
                    }
                    Some(MarketEvent::ProtocolError { message }) => {
                        warn!("[MM] Venue protocol error: {}", message);
                        None
                    }
                    None => {
                        // feed task ended; its result says whether this is
                        // a graceful close or a dead feed
                        let result = feed_task.await;
                        break match result {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(e)) => Err(StrategyError::Feed(e)),
                            Err(e) => Err(StrategyError::Other(anyhow::anyhow!(
                                "feed task panicked: {}",
                                e
                            ))),
                        };
                    }
                },
                _ = idle_tick.tick() => gate.qualify_tick(book.mid(), Instant::now()),
                _ = resync_tick.tick() => {
                    if let Err(e) = self.engine.sync_open_orders().await {
                        warn!("[MM] Open-order re-sync failed: {}", e);
                    }
                    None
                }
                _ = status_tick.tick() => {
                    let (bids, asks) = self.engine.open_counts();
                    info!(
                        "[MM] Heartbeat: {} bids / {} asks resting, ref {:?}",
                        bids, asks, gate.last_quoted_ref
                    );
                    None
                }
            };

            let Some(reference) = reference else { continue };

            match self.run_cycle(reference).await {
                Ok(()) => {
                    gate.record_cycle(reference, Instant::now());
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        "[MM] Cycle failed ({} consecutive): {}",
                        consecutive_failures, e
                    );
                    if consecutive_failures >= self.config.cycle.max_cycle_failures {
                        break Err(StrategyError::RepeatedCycleFailures {
                            failures: consecutive_failures,
                            threshold: self.config.cycle.max_cycle_failures,
                        });
                    }
                }
            }
        };

        self.active.store(false, Ordering::Release);

        match outcome {
            Ok(()) => {
                info!("[MM] Stop requested, tearing down");
                self.shutdown_cleanup().await;
                Ok(())
            }
            Err(e) => {
                self.state.set(LoopState::Crashed);
                Err(e)
            }
        }
    }

    /// Cancel resting orders first, then drop the run flag so the loop and
    /// its feed session wind down.
    async fn stop(&mut self) -> StrategyResult<()> {
        self.shutdown_cleanup().await;
        self.active.store(false, Ordering::Release);
        Ok(())
    }

    fn status(&self) -> StatusReport {
        let (open_bids, open_asks) = self.engine.open_counts();
        StatusReport {
            state: self.state.get(),
            open_bids,
            open_asks,
            last_cycle_time: *self.last_cycle.lock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{OrderAck, RetryPolicy, StaticBalances, TransportError};
    use crate::infrastructure::rate_limit::RateLimiter;
    use crate::types::{Balances, Order, Side};
    use crate::utils::shutdown::{ShutdownFlag, ShutdownManager};

    struct NoopClient;

    #[async_trait]
    impl AccountClient for NoopClient {
        async fn add_order(
            &self,
            _pair: &str,
            _side: Side,
            _price: f64,
            _volume: f64,
        ) -> Result<OrderAck, TransportError> {
            Ok(OrderAck { txid: "T".into() })
        }

        async fn edit_order(
            &self,
            _txid: &str,
            _pair: &str,
            _side: Side,
            _price: f64,
            _volume: f64,
        ) -> Result<OrderAck, TransportError> {
            Ok(OrderAck { txid: "T2".into() })
        }

        async fn cancel_order(&self, _txid: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn open_orders(&self, _pair: &str) -> Result<Vec<Order>, TransportError> {
            Ok(Vec::new())
        }
    }

    fn test_config() -> MarketMakerConfig {
        serde_yaml::from_str(
            r#"
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
"#,
        )
        .unwrap()
    }

    fn market_maker() -> MarketMaker<NoopClient> {
        let config = test_config();
        let flag = ShutdownFlag::new();
        let limiter = Arc::new(RateLimiter::new(
            1000,
            Duration::from_secs(1),
            flag.clone(),
        ));
        let engine = Arc::new(ExecutionEngine::new(
            Arc::new(NoopClient),
            limiter,
            &config.pair,
            config.ladder.rungs_per_side,
            RetryPolicy::default(),
            flag,
        ));
        let balances = Arc::new(StaticBalances::new(Balances::new(1.0, 50000.0)));
        MarketMaker::new(config, engine, balances)
    }

    #[test]
    fn test_top_of_book_merges_partial_updates() {
        let mut book = TopOfBook::default();
        assert_eq!(book.mid(), None);

        book.update(Some(49950.0), None);
        assert_eq!(book.mid(), None);

        book.update(None, Some(50050.0));
        assert_eq!(book.mid(), Some(50000.0));

        // a one-sided update keeps the other side
        book.update(Some(49960.0), None);
        assert_eq!(book.mid(), Some(50005.0));
    }

    #[test]
    fn test_loop_state_transitions() {
        let state = AtomicLoopState::new();
        assert_eq!(state.get(), LoopState::Idle);
        state.set(LoopState::Running);
        assert_eq!(state.get(), LoopState::Running);
        state.set(LoopState::Stopping);
        assert_eq!(state.get(), LoopState::Stopping);
        state.set(LoopState::Crashed);
        assert_eq!(state.get(), LoopState::Crashed);
    }

    #[test]
    fn test_gate_first_mid_always_qualifies() {
        let gate = CycleGate::new(0.5, Duration::from_secs(1));
        assert_eq!(gate.qualify_book(None), None);
        assert_eq!(gate.qualify_book(Some(50000.0)), Some(50000.0));
    }

    #[test]
    fn test_gate_sub_threshold_move_does_not_requote() {
        let mut gate = CycleGate::new(0.5, Duration::from_secs(1));
        gate.record_cycle(50000.0, Instant::now());

        assert_eq!(gate.qualify_book(Some(50000.3)), None);
        assert_eq!(gate.qualify_book(Some(50000.6)), Some(50000.6));
        // cumulative drift measures against the last quoted reference
        assert_eq!(gate.qualify_book(Some(49999.4)), Some(49999.4));
    }

    #[test]
    fn test_gate_tick_waits_a_full_interval_after_a_cycle() {
        let mut gate = CycleGate::new(0.5, Duration::from_secs(1));
        let now = Instant::now();

        // no cycle yet: a tick with a known mid quotes immediately
        assert_eq!(gate.qualify_tick(Some(50000.0), now), Some(50000.0));

        gate.record_cycle(50000.0, now);
        // a tick right after a cycle does not sneak a sub-threshold move in
        assert_eq!(
            gate.qualify_tick(Some(50000.2), now + Duration::from_millis(500)),
            None
        );
        // once the loop stayed quiet a full interval, the tick quotes
        assert_eq!(
            gate.qualify_tick(Some(50000.2), now + Duration::from_secs(1)),
            Some(50000.2)
        );
    }

    #[tokio::test]
    async fn test_stop_request_ends_the_run_loop() {
        let mut mm = market_maker();
        mm.stop().await.unwrap();

        let ctx = StrategyContext::new(Arc::new(ShutdownManager::new()));
        let result = tokio::time::timeout(Duration::from_secs(5), mm.start(&ctx))
            .await
            .expect("loop must exit after stop");
        assert!(result.is_ok());
        assert_eq!(mm.status().state, LoopState::Idle);
    }
}
