use rand::Rng;
use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// Implement this trait to control how the client should
/// behave when reconnecting after a disconnection.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Exponential backoff reconnection strategy with jitter
///
/// Base delays grow exponentially: initial_delay * 2^attempt, capped at
/// max_delay. A random jitter of up to `jitter_frac` of the base delay is
/// added on top so that a fleet of clients does not reconnect in lockstep.
/// With `jitter_frac <= 1.0` consecutive delays are still non-decreasing.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    jitter_frac: f64,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    ///
    /// # Arguments
    /// * `initial_delay` - The delay before the first reconnect
    /// * `max_delay` - The cap on the base delay
    /// * `jitter_frac` - Jitter as a fraction of the base delay, clamped to [0, 1]
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        jitter_frac: f64,
        max_attempts: Option<usize>,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            jitter_frac: jitter_frac.clamp(0.0, 1.0),
            max_attempts,
        }
    }

    /// Base delay for an attempt, before jitter.
    pub fn base_delay(&self, attempt: usize) -> Duration {
        let exp = 2u64.checked_pow(attempt.min(32) as u32).unwrap_or(u64::MAX);
        let ms = (self.initial_delay.as_millis() as u64).saturating_mul(exp);
        Duration::from_millis(ms.min(self.max_delay.as_millis() as u64))
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let base = self.base_delay(attempt);
        let jitter_ms = if self.jitter_frac > 0.0 {
            let bound = (base.as_millis() as f64 * self.jitter_frac) as u64;
            if bound > 0 {
                rand::thread_rng().gen_range(0..=bound)
            } else {
                0
            }
        } else {
            0
        };
        Some(base + Duration::from_millis(jitter_ms))
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    /// Create a new fixed delay strategy
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Never reconnect strategy
///
/// The client will not attempt to reconnect after disconnection
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}
