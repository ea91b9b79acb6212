//! Graceful shutdown: one process-wide flag plus the interruptible waits
//! built on it.
//!
//! Everything that sleeps between venue calls (engine retry delays,
//! rate-limit waits, supervisor restart delays) waits through
//! [`ShutdownFlag`] so a stop signal interrupts the wait instead of
//! expiring behind it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::sleep;
use tracing::info;

/// Interval at which interruptible waits re-check the flag
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Cloneable view of a shutdown flag.
#[derive(Clone)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn shut_down(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Sleep in short slices, waking early when the flag drops.
    ///
    /// Returns `false` if shutdown was requested before the full duration
    /// elapsed.
    pub async fn interruptible_sleep(&self, duration: Duration) -> bool {
        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            if !self.is_running() {
                return false;
            }
            let slice = POLL_SLICE.min(duration - elapsed);
            sleep(slice).await;
            elapsed += slice;
        }
        self.is_running()
    }
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the process shutdown flag and the Ctrl+C handler.
pub struct ShutdownManager {
    flag: ShutdownFlag,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            flag: ShutdownFlag::new(),
        }
    }

    /// Spawn a Ctrl+C signal handler that drops the flag
    pub fn spawn_signal_handler(&self) {
        let flag = self.flag.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("");
                info!("Received shutdown signal (Ctrl+C)");
                info!("Shutting down gracefully...");
                flag.shut_down();
            }
        });
    }

    /// Trigger shutdown programmatically
    pub fn trigger(&self) {
        self.flag.shut_down();
    }

    pub fn is_running(&self) -> bool {
        self.flag.is_running()
    }

    /// Flag view for components that outlive this call frame
    pub fn flag(&self) -> ShutdownFlag {
        self.flag.clone()
    }

    /// Sleep for a duration, waking early if shutdown is triggered
    pub async fn interruptible_sleep(&self, duration: Duration) -> bool {
        self.flag.interruptible_sleep(duration).await
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_drops_every_view() {
        let manager = ShutdownManager::new();
        let view = manager.flag();
        assert!(manager.is_running());
        assert!(view.is_running());

        manager.trigger();
        assert!(!manager.is_running());
        assert!(!view.is_running());
    }

    #[tokio::test]
    async fn test_interruptible_sleep_completes_while_running() {
        let flag = ShutdownFlag::new();
        assert!(flag.interruptible_sleep(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_interruptible_sleep_aborts_on_shutdown() {
        let flag = ShutdownFlag::new();
        flag.shut_down();

        let start = std::time::Instant::now();
        assert!(!flag.interruptible_sleep(Duration::from_secs(30)).await);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
