//! Frame Staleness Tracker
//!
//! Tracks the arrival time of the most recent frame to detect dead/zombie
//! feed sessions. A session is considered stale if no frame of any kind has
//! arrived within the configured window.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Tracks frame arrival to detect stale sessions
///
/// Uses atomic operations for lock-free access from multiple tasks.
/// Timestamps are stored as milliseconds since an internal epoch to allow
/// atomic u64 operations.
pub struct StalenessTracker {
    /// Epoch time when tracking started (for converting Instant to u64)
    epoch: Instant,
    /// Last frame received (ms since epoch); 0 = never
    last_frame_ms: AtomicU64,
    /// Staleness window - if no frame within this duration, the session is stale
    window: Duration,
}

impl StalenessTracker {
    /// Create a new tracker with the specified staleness window.
    pub fn new(window: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            last_frame_ms: AtomicU64::new(0),
            window,
        }
    }

    /// Record that a frame was just received.
    ///
    /// Call this for every frame, including heartbeats: any traffic proves
    /// the session is alive.
    pub fn record_frame(&self) {
        // +1 so that a frame at the epoch itself is distinguishable from "never"
        let ms = self.epoch.elapsed().as_millis() as u64 + 1;
        self.last_frame_ms.store(ms, Ordering::Release);
    }

    /// Check whether the session has gone stale.
    ///
    /// Returns false until the first frame is recorded: staleness only
    /// applies to a session that has produced traffic. Session startup is
    /// bounded separately by the handshake/subscription timeouts.
    pub fn is_stale(&self) -> bool {
        let frame_ms = self.last_frame_ms.load(Ordering::Acquire);
        if frame_ms == 0 {
            return false;
        }
        let now_ms = self.epoch.elapsed().as_millis() as u64 + 1;
        now_ms.saturating_sub(frame_ms) >= self.window.as_millis() as u64
    }

    /// Time since the last frame, or None if no frame was ever recorded.
    pub fn time_since_last_frame(&self) -> Option<Duration> {
        let frame_ms = self.last_frame_ms.load(Ordering::Acquire);
        if frame_ms == 0 {
            return None;
        }
        let now_ms = self.epoch.elapsed().as_millis() as u64 + 1;
        Some(Duration::from_millis(now_ms.saturating_sub(frame_ms)))
    }

    /// Remaining time before the session goes stale.
    ///
    /// Returns the full window when no frame has been recorded yet.
    pub fn time_to_stale(&self) -> Duration {
        match self.time_since_last_frame() {
            Some(elapsed) => self.window.saturating_sub(elapsed),
            None => self.window,
        }
    }

    /// The configured staleness window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reset the tracker state.
    ///
    /// Call this when reconnecting to start fresh.
    pub fn reset(&self) {
        self.last_frame_ms.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_not_stale_before_first_frame() {
        let tracker = StalenessTracker::new(Duration::from_millis(10));
        sleep(Duration::from_millis(20));
        assert!(!tracker.is_stale());
    }

    #[test]
    fn test_fresh_frame_not_stale() {
        let tracker = StalenessTracker::new(Duration::from_secs(5));
        tracker.record_frame();
        assert!(!tracker.is_stale());
    }

    #[test]
    fn test_stale_after_window() {
        let tracker = StalenessTracker::new(Duration::from_millis(50));
        tracker.record_frame();
        sleep(Duration::from_millis(60));
        assert!(tracker.is_stale());
    }

    #[test]
    fn test_frame_resets_window() {
        let tracker = StalenessTracker::new(Duration::from_millis(80));
        tracker.record_frame();
        sleep(Duration::from_millis(50));
        tracker.record_frame();
        sleep(Duration::from_millis(50));
        // 100ms since first frame but only 50ms since the second
        assert!(!tracker.is_stale());
    }

    #[test]
    fn test_reset() {
        let tracker = StalenessTracker::new(Duration::from_millis(30));
        tracker.record_frame();
        sleep(Duration::from_millis(40));
        assert!(tracker.is_stale());

        tracker.reset();
        assert!(!tracker.is_stale());
    }

    #[test]
    fn test_time_since_last_frame() {
        let tracker = StalenessTracker::new(Duration::from_secs(5));
        assert!(tracker.time_since_last_frame().is_none());

        tracker.record_frame();
        sleep(Duration::from_millis(10));
        let elapsed = tracker.time_since_last_frame().unwrap();
        assert!(elapsed >= Duration::from_millis(10));
    }
}
