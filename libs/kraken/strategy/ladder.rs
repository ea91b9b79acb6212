//! Ladder generation.
//!
//! Pure functions from (reference price, balances, parameters) to the
//! desired order set. Deterministic for given inputs; no side effects.

use crate::types::{Ladder, Rung, Side};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LadderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Ladder shape parameters.
///
/// Spreads are in basis points of the reference price; `rung_increment` is
/// an absolute price step between consecutive rungs on the same side.
#[derive(Debug, Clone, Deserialize)]
pub struct LadderParams {
    /// Distance of the first buy rung below the reference price, in bps
    pub bid_spread_bps: f64,
    /// Distance of the first sell rung above the reference price, in bps
    pub ask_spread_bps: f64,
    /// Absolute price step between consecutive rungs
    pub rung_increment: f64,
    /// Number of rungs per side
    pub rungs_per_side: usize,
    /// Venue minimum order size; a side whose per-rung size would fall
    /// below this is left empty
    pub min_order: f64,
    /// Cap on the total size committed per side
    pub max_order: f64,
}

impl Default for LadderParams {
    fn default() -> Self {
        Self {
            bid_spread_bps: 10.0,
            ask_spread_bps: 10.0,
            rung_increment: 5.0,
            rungs_per_side: 5,
            min_order: 0.0001,
            max_order: f64::MAX,
        }
    }
}

impl LadderParams {
    fn validate(&self) -> Result<(), LadderError> {
        if self.rungs_per_side == 0 {
            return Err(LadderError::InvalidInput("rungs_per_side is zero".into()));
        }
        if !(self.bid_spread_bps > 0.0) || !(self.ask_spread_bps > 0.0) {
            return Err(LadderError::InvalidInput(
                "spreads must be strictly positive".into(),
            ));
        }
        if !(self.rung_increment > 0.0) {
            return Err(LadderError::InvalidInput(
                "rung_increment must be strictly positive".into(),
            ));
        }
        if self.min_order < 0.0 || self.max_order <= 0.0 {
            return Err(LadderError::InvalidInput("bad order size bounds".into()));
        }
        Ok(())
    }
}

/// Total size to commit on each side, derived from balances.
///
/// The buy notional never exceeds the available currency and the sell size
/// never exceeds the available asset balance; both are capped at
/// `max_order`. A side whose total falls below `min_order` gets zero,
/// yielding an empty ladder on that side rather than an order below the
/// venue minimum.
pub fn generate_positions(
    asset_price: f64,
    asset_balance: f64,
    currency_balance: f64,
    params: &LadderParams,
) -> Result<(f64, f64), LadderError> {
    params.validate()?;
    if !asset_price.is_finite() || asset_price <= 0.0 {
        return Err(LadderError::InvalidInput(format!(
            "asset price must be positive and finite, got {}",
            asset_price
        )));
    }
    if asset_balance < 0.0 || currency_balance < 0.0 {
        return Err(LadderError::InvalidInput("negative balance".into()));
    }

    let buy_size = floor_to_zero((currency_balance / asset_price).min(params.max_order), params);
    let sell_size = floor_to_zero(asset_balance.min(params.max_order), params);
    Ok((buy_size, sell_size))
}

fn floor_to_zero(size: f64, params: &LadderParams) -> f64 {
    if size < params.min_order {
        0.0
    } else {
        size
    }
}

/// Build the desired ladder around a reference price.
///
/// Rung k (0-indexed) on the buy side rests at
/// `p * (1 - bid_spread) - k * increment` with size `buy_size / N`; the sell
/// side mirrors it above the price. Sizes are an equal split of the side
/// total. A side with zero total produces zero rungs.
pub fn build_ladder(
    reference_price: f64,
    buy_size: f64,
    sell_size: f64,
    params: &LadderParams,
) -> Result<Ladder, LadderError> {
    params.validate()?;
    if !reference_price.is_finite() || reference_price <= 0.0 {
        return Err(LadderError::InvalidInput(format!(
            "reference price must be positive and finite, got {}",
            reference_price
        )));
    }

    let n = params.rungs_per_side;
    let mut ladder = Ladder::empty(reference_price);

    if buy_size > 0.0 {
        let top = reference_price * (1.0 - params.bid_spread_bps / 10_000.0);
        let per_rung = buy_size / n as f64;
        for k in 0..n {
            let price = top - k as f64 * params.rung_increment;
            if price <= 0.0 {
                return Err(LadderError::InvalidInput(format!(
                    "buy rung {} priced at {} (non-positive)",
                    k, price
                )));
            }
            ladder.bids.push(Rung::new(Side::Buy, price, per_rung));
        }
    }

    if sell_size > 0.0 {
        let top = reference_price * (1.0 + params.ask_spread_bps / 10_000.0);
        let per_rung = sell_size / n as f64;
        for k in 0..n {
            let price = top + k as f64 * params.rung_increment;
            ladder.asks.push(Rung::new(Side::Sell, price, per_rung));
        }
    }

    Ok(ladder)
}
