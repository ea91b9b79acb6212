//! Kraken market-maker binary crate.
//!
//! The actual logic lives in the `kraken` and `feedline` libraries; this
//! crate only wires them into a runnable process.

pub use kraken;
