//! Execution engine.
//!
//! Applies reconciler operations to the venue, one at a time, through the
//! shared rate limiter. Owns the live order set: every confirmed response
//! mutates it, every failure leaves the affected slot's prior state intact.
//! A failed operation never aborts the rest of the batch; a partial ladder
//! is preferred over a stalled one.

use crate::execution::live_orders::{LiveOrders, SharedLiveOrders};
use crate::execution::transport::{AccountClient, TransportError};
use crate::infrastructure::rate_limit::RateLimiter;
use crate::strategy::reconcile::OrderOp;
use crate::types::{Order, OrderStatus, Side};
use crate::utils::shutdown::ShutdownFlag;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry policy for transient transport failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(250),
        }
    }
}

/// Outcome summary of one `apply()` batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Venue rejections; not retried
    pub rejected: usize,
    /// Transient failures that exhausted their retries
    pub failed: usize,
    /// Operations skipped because shutdown interrupted the batch
    pub skipped: usize,
}

impl ApplyReport {
    pub fn fully_converged(&self) -> bool {
        self.succeeded == self.attempted
    }
}

/// Applies order operations for one pair.
pub struct ExecutionEngine<C: AccountClient> {
    client: Arc<C>,
    limiter: Arc<RateLimiter>,
    live: SharedLiveOrders,
    pair: String,
    retry: RetryPolicy,
    shutdown: ShutdownFlag,
}

impl<C: AccountClient> ExecutionEngine<C> {
    pub fn new(
        client: Arc<C>,
        limiter: Arc<RateLimiter>,
        pair: impl Into<String>,
        max_per_side: usize,
        retry: RetryPolicy,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            client,
            limiter,
            live: LiveOrders::shared(max_per_side),
            pair: pair.into(),
            retry,
            shutdown,
        }
    }

    /// Shared handle to the live order set.
    pub fn live_orders(&self) -> SharedLiveOrders {
        Arc::clone(&self.live)
    }

    /// Non-terminal order counts as (bids, asks).
    pub fn open_counts(&self) -> (usize, usize) {
        let live = self.live.read();
        (live.count(Side::Buy), live.count(Side::Sell))
    }

    /// Rebuild the live set from the venue's view of our open orders.
    ///
    /// Runs at startup before the first cycle: the engine never assumes an
    /// empty book after a restart.
    pub async fn sync_open_orders(&self) -> Result<(), TransportError> {
        self.limiter
            .acquire()
            .await
            .map_err(|_| TransportError::Interrupted)?;
        let orders = self.client.open_orders(&self.pair).await?;
        info!(
            "[Engine] Synced {} open orders from venue for {}",
            orders.len(),
            self.pair
        );
        self.live.write().replace_all(orders);
        Ok(())
    }

    /// Execute a batch sequentially.
    ///
    /// Operations on one pair never run concurrently; they mutate the same
    /// live-order slots. Stops early only on shutdown.
    pub async fn apply(&self, ops: Vec<OrderOp>) -> ApplyReport {
        let mut report = ApplyReport {
            attempted: ops.len(),
            ..Default::default()
        };

        for (index, op) in ops.into_iter().enumerate() {
            if !self.is_running() {
                report.skipped = report.attempted - index;
                debug!("[Engine] Shutdown during batch, {} ops skipped", report.skipped);
                break;
            }

            match self.execute_with_retry(&op).await {
                Ok(()) => report.succeeded += 1,
                Err(TransportError::Rejected(reason)) => {
                    warn!("[Engine] Venue rejected '{}': {}", op, reason);
                    report.rejected += 1;
                }
                Err(TransportError::Interrupted) => {
                    report.skipped = report.attempted - index;
                    break;
                }
                Err(e) => {
                    warn!("[Engine] Operation '{}' failed: {}", op, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Best-effort cancellation of every live order, used on shutdown.
    ///
    /// Runs after the stop signal, so it takes rate-limit slots through the
    /// shutdown path and logs failures instead of propagating them.
    pub async fn cancel_all(&self) -> usize {
        let orders: Vec<Order> = self.live.read().snapshot();
        let mut canceled = 0;

        for order in orders {
            let Some(id) = order.id.clone() else { continue };

            if let Err(e) = self
                .limiter
                .acquire_for_shutdown(Duration::from_secs(10))
                .await
            {
                warn!("[Engine] No rate-limit slot for shutdown cancel: {}", e);
                continue;
            }

            match self.client.cancel_order(&id).await {
                Ok(()) => {
                    self.live.write().remove(&id);
                    canceled += 1;
                }
                Err(e) => warn!("[Engine] Shutdown cancel of {} failed: {}", id, e),
            }
        }

        info!("[Engine] Shutdown canceled {} orders", canceled);
        canceled
    }

    async fn execute_with_retry(&self, op: &OrderOp) -> Result<(), TransportError> {
        let mut attempt = 0;
        loop {
            // every network call takes a fresh rate-limit token
            self.limiter
                .acquire()
                .await
                .map_err(|_| TransportError::Interrupted)?;

            match self.execute(op).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    debug!(
                        "[Engine] Transient failure on '{}' (attempt {}): {}",
                        op, attempt, e
                    );
                    if !self.shutdown.interruptible_sleep(self.retry.retry_delay).await {
                        return Err(TransportError::Interrupted);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute(&self, op: &OrderOp) -> Result<(), TransportError> {
        match op {
            OrderOp::Place(rung) => {
                // the slot is reserved before the call goes out; the ack
                // promotes it, any failure releases it
                self.live
                    .write()
                    .insert_pending(rung.side, rung.price, rung.size);
                match self
                    .client
                    .add_order(&self.pair, rung.side, rung.price, rung.size)
                    .await
                {
                    Ok(ack) => {
                        debug!(
                            "[Engine] Placed {} {} @ {} -> {}",
                            rung.side, rung.size, rung.price, ack.txid
                        );
                        self.live
                            .write()
                            .confirm_pending(rung.side, rung.price, ack.txid);
                        Ok(())
                    }
                    Err(e) => {
                        self.live.write().drop_pending(rung.side, rung.price);
                        Err(e)
                    }
                }
            }
            OrderOp::Edit {
                id,
                side,
                price,
                size,
            } => {
                self.live.write().set_status(id, OrderStatus::Editing);
                match self
                    .client
                    .edit_order(id, &self.pair, *side, *price, *size)
                    .await
                {
                    Ok(ack) => {
                        debug!("[Engine] Edited {} -> {} @ {}", id, ack.txid, price);
                        self.live.write().apply_edit(id, ack.txid, *price, *size);
                        Ok(())
                    }
                    Err(e) if e.is_unknown_order() => {
                        // filled or canceled out-of-band; mark it closed so
                        // the next purge frees its ladder rank
                        warn!("[Engine] Edit target {} gone from venue, closing", id);
                        self.live.write().set_status(id, OrderStatus::Closed);
                        Err(e)
                    }
                    Err(e) => {
                        // the order still rests with its old terms
                        self.live.write().set_status(id, OrderStatus::Open);
                        Err(e)
                    }
                }
            }
            OrderOp::Cancel { id, .. } => {
                self.live.write().set_status(id, OrderStatus::Canceling);
                match self.client.cancel_order(id).await {
                    Ok(()) => {
                        debug!("[Engine] Canceled {}", id);
                        self.live.write().remove(id);
                        Ok(())
                    }
                    Err(e) if e.is_unknown_order() => {
                        // already off the book, which is all a cancel wants
                        debug!("[Engine] Cancel target {} already gone", id);
                        self.live.write().remove(id);
                        Ok(())
                    }
                    Err(e) => {
                        self.live.write().set_status(id, OrderStatus::Open);
                        Err(e)
                    }
                }
            }
        }
    }

    fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }
}
