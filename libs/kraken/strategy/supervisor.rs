//! Strategy auto-restart supervisor.
//!
//! Thin outer controller: any unhandled failure from `initialize()` or
//! `start()` is logged, a fixed delay passes, and a fresh strategy instance
//! replaces the crashed one. The strategy surfaces unrecoverable errors up;
//! the supervisor is the only place that decides to try again.

use crate::strategy::traits::{Strategy, StrategyContext, StrategyResult};
use std::time::Duration;
use tracing::{error, info};

/// Run strategies built by `make` until one finishes cleanly or shutdown.
pub async fn run_supervised<S, F>(
    mut make: F,
    ctx: &StrategyContext,
    restart_delay: Duration,
) -> StrategyResult<()>
where
    S: Strategy,
    F: FnMut() -> S + Send,
{
    let mut restarts: u32 = 0;

    loop {
        if !ctx.is_running() {
            return Ok(());
        }

        let mut strategy = make();
        if restarts == 0 {
            info!("[Supervisor] Starting strategy '{}'", strategy.name());
        } else {
            info!(
                "[Supervisor] Restart #{} of strategy '{}'",
                restarts,
                strategy.name()
            );
        }

        let result = match strategy.initialize(ctx).await {
            Ok(()) => strategy.start(ctx).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("[Supervisor] Strategy '{}' finished cleanly", strategy.name());
                return Ok(());
            }
            Err(e) => {
                error!("[Supervisor] Strategy '{}' failed: {}", strategy.name(), e);
                if !ctx.is_running() {
                    // failure raced the shutdown signal; nothing to restart
                    return Ok(());
                }
                restarts += 1;
                info!("[Supervisor] Restarting in {:?}", restart_delay);
                ctx.shutdown.interruptible_sleep(restart_delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::traits::{LoopState, StatusReport, StrategyError};
    use crate::utils::shutdown::ShutdownManager;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyStrategy {
        starts: Arc<AtomicU32>,
        fail_times: u32,
    }

    #[async_trait]
    impl Strategy for FlakyStrategy {
        fn name(&self) -> &str {
            "flaky"
        }

        fn description(&self) -> &str {
            "fails a configured number of times, then succeeds"
        }

        async fn start(&mut self, _ctx: &StrategyContext) -> StrategyResult<()> {
            let attempt = self.starts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_times {
                Err(StrategyError::Config("induced failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn status(&self) -> StatusReport {
            StatusReport {
                state: LoopState::Idle,
                open_bids: 0,
                open_asks: 0,
                last_cycle_time: None,
            }
        }
    }

    #[tokio::test]
    async fn test_restarts_fresh_instance_until_success() {
        let shutdown = Arc::new(ShutdownManager::new());
        let ctx = StrategyContext::new(shutdown);
        let starts = Arc::new(AtomicU32::new(0));

        let make_starts = Arc::clone(&starts);
        run_supervised(
            move || FlakyStrategy {
                starts: Arc::clone(&make_starts),
                fail_times: 2,
            },
            &ctx,
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert_eq!(starts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_stops_restarting() {
        let shutdown = Arc::new(ShutdownManager::new());
        let ctx = StrategyContext::new(Arc::clone(&shutdown));
        let starts = Arc::new(AtomicU32::new(0));
        shutdown.trigger();

        let make_starts = Arc::clone(&starts);
        run_supervised(
            move || FlakyStrategy {
                starts: Arc::clone(&make_starts),
                fail_times: u32::MAX,
            },
            &ctx,
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert_eq!(starts.load(Ordering::SeqCst), 0);
    }
}
