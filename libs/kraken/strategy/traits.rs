//! Strategy trait definition
//!
//! Defines the contract between the supervising process and a trading
//! strategy: start/stop lifecycle plus an observable status snapshot.

use crate::execution::TransportError;
use crate::strategy::ladder::LadderError;
use crate::utils::shutdown::ShutdownManager;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for strategy operations
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Errors that can occur in strategy execution
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] feedline::FeedError),

    #[error("Ladder error: {0}")]
    Ladder(#[from] LadderError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Strategy interrupted by shutdown")]
    Shutdown,

    #[error("{failures} consecutive cycle failures (threshold {threshold})")]
    RepeatedCycleFailures { failures: u32, threshold: u32 },

    #[error("Strategy error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Lifecycle state of a strategy loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Crashed,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoopState::Idle => "idle",
            LoopState::Running => "running",
            LoopState::Stopping => "stopping",
            LoopState::Crashed => "crashed",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot returned by `Strategy::status()`
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub state: LoopState,
    pub open_bids: usize,
    pub open_asks: usize,
    pub last_cycle_time: Option<DateTime<Utc>>,
}

/// Context provided to all strategies
pub struct StrategyContext {
    /// Shutdown manager for interruptible operations
    pub shutdown: Arc<ShutdownManager>,
}

impl StrategyContext {
    pub fn new(shutdown: Arc<ShutdownManager>) -> Self {
        Self { shutdown }
    }

    /// Check if the strategy should continue running
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }
}

/// Trait implemented by every trading strategy
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy name for logging and identification
    fn name(&self) -> &str;

    /// What this strategy does
    fn description(&self) -> &str;

    /// Called once before `start()`; rebuilds any venue-side state the
    /// strategy relies on (e.g. the current open-order set).
    async fn initialize(&mut self, _ctx: &StrategyContext) -> StrategyResult<()> {
        Ok(())
    }

    /// Run the main loop until the shutdown flag drops or an unrecoverable
    /// error occurs. Unrecoverable errors must be surfaced, never swallowed.
    async fn start(&mut self, ctx: &StrategyContext) -> StrategyResult<()>;

    /// Stop gracefully. Best-effort cleanup; must not block shutdown on
    /// failures.
    async fn stop(&mut self) -> StrategyResult<()> {
        Ok(())
    }

    /// Current state snapshot for the supervising process.
    fn status(&self) -> StatusReport;
}
