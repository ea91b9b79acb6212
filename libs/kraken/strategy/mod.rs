//! Strategy layer: ladder generation, reconciliation, the market-making
//! loop, and its restart supervisor.

pub mod ladder;
pub mod mm;
pub mod reconcile;
pub mod supervisor;
pub mod traits;

pub use ladder::{build_ladder, generate_positions, LadderError, LadderParams};
pub use mm::MarketMaker;
pub use reconcile::{reconcile, OrderOp, ReconcileParams};
pub use supervisor::run_supervised;
pub use traits::{
    LoopState, StatusReport, Strategy, StrategyContext, StrategyError, StrategyResult,
};
