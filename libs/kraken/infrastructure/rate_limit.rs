//! Outbound request rate limiting.
//!
//! One limiter instance is shared by every component that talks to the
//! venue. Fixed-window accounting: up to `limit` acquisitions per window,
//! then callers suspend cooperatively until the window rolls over.

use crate::utils::shutdown::ShutdownFlag;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

/// Interval at which waiting acquirers re-check the shutdown flag
const WAIT_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Rate limiter wait interrupted by shutdown")]
    Interrupted,

    #[error("Rate limiter wait timed out")]
    Timeout,
}

/// Window accounting state
#[derive(Debug)]
struct RateBudget {
    window_start: Instant,
    count: u32,
}

/// Token-window rate limiter.
///
/// Safe for concurrent acquisition from multiple tasks; waits are
/// cooperative suspensions, never busy-spins, and wake promptly on
/// shutdown.
pub struct RateLimiter {
    budget: Mutex<RateBudget>,
    limit: u32,
    window: Duration,
    shutdown: ShutdownFlag,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration, shutdown: ShutdownFlag) -> Self {
        Self {
            budget: Mutex::new(RateBudget {
                window_start: Instant::now(),
                count: 0,
            }),
            limit,
            window,
            shutdown,
        }
    }

    /// Take a slot immediately if one is free.
    pub fn try_acquire(&self) -> bool {
        let mut budget = self.budget.lock();
        let now = Instant::now();
        if now.duration_since(budget.window_start) >= self.window {
            budget.window_start = now;
            budget.count = 0;
        }
        if budget.count < self.limit {
            budget.count += 1;
            true
        } else {
            false
        }
    }

    /// Wait for a slot, waking early on shutdown.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        loop {
            if !self.is_running() {
                return Err(RateLimitError::Interrupted);
            }
            if self.try_acquire() {
                return Ok(());
            }
            sleep(self.time_until_slot().min(WAIT_SLICE)).await;
        }
    }

    /// Wait for a slot regardless of the shutdown flag, bounded by
    /// `timeout`. Used only by the best-effort shutdown cancels.
    pub async fn acquire_for_shutdown(&self, timeout: Duration) -> Result<(), RateLimitError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_acquire() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RateLimitError::Timeout);
            }
            sleep(self.time_until_slot().min(WAIT_SLICE)).await;
        }
    }

    /// Remaining time until the current window rolls over.
    pub fn time_until_slot(&self) -> Duration {
        let budget = self.budget.lock();
        (budget.window_start + self.window).saturating_duration_since(Instant::now())
    }

    fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    fn limiter(limit: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(limit, Duration::from_millis(window_ms), ShutdownFlag::new())
    }

    #[test]
    fn test_limit_within_window() {
        let rl = limiter(3, 60_000);
        assert!(rl.try_acquire());
        assert!(rl.try_acquire());
        assert!(rl.try_acquire());
        assert!(!rl.try_acquire());
    }

    #[test]
    fn test_window_rollover_refills() {
        let rl = limiter(1, 20);
        assert!(rl.try_acquire());
        assert!(!rl.try_acquire());
        std::thread::sleep(Duration::from_millis(30));
        assert!(rl.try_acquire());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_slot() {
        let rl = limiter(1, 30);
        assert!(rl.try_acquire());
        let start = Instant::now();
        rl.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_acquire_interrupted_by_shutdown() {
        let flag = ShutdownFlag::new();
        let rl = Arc::new(RateLimiter::new(1, Duration::from_secs(60), flag.clone()));
        assert!(rl.try_acquire());

        let waiter = Arc::clone(&rl);
        let handle = tokio::spawn(async move { waiter.acquire().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        flag.shut_down();

        let result = handle.await.unwrap();
        assert_eq!(result, Err(RateLimitError::Interrupted));
    }

    #[tokio::test]
    async fn test_shutdown_acquire_ignores_flag() {
        let flag = ShutdownFlag::new();
        flag.shut_down();
        let rl = RateLimiter::new(1, Duration::from_millis(20), flag);
        assert!(rl.try_acquire());
        // flag is down, but the shutdown path still gets its slot
        rl.acquire_for_shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_acquire_times_out() {
        let flag = ShutdownFlag::new();
        flag.shut_down();
        let rl = RateLimiter::new(1, Duration::from_secs(60), flag);
        assert!(rl.try_acquire());
        let result = rl.acquire_for_shutdown(Duration::from_millis(30)).await;
        assert_eq!(result, Err(RateLimitError::Timeout));
    }
}
