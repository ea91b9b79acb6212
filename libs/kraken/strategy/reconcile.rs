//! Order reconciliation.
//!
//! Diffs the live order set against the freshly generated ladder and emits
//! the minimal operation list that converges the two. Live orders and rungs
//! are paired by rank (index after sorting both by distance from the
//! reference price), so a shifted ladder becomes N edits instead of N
//! cancels plus N places. Requests are rate-limited and each one carries
//! latency risk, so fewer operations is strictly better.

use crate::types::{Ladder, Order, Rung, Side};
use serde::Deserialize;
use std::cmp::Ordering;

/// One operation against the venue.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOp {
    Place(Rung),
    Edit {
        id: String,
        side: Side,
        price: f64,
        size: f64,
    },
    Cancel {
        id: String,
        side: Side,
    },
}

impl OrderOp {
    pub fn side(&self) -> Side {
        match self {
            OrderOp::Place(rung) => rung.side,
            OrderOp::Edit { side, .. } => *side,
            OrderOp::Cancel { side, .. } => *side,
        }
    }
}

impl std::fmt::Display for OrderOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderOp::Place(rung) => {
                write!(f, "place {} {} @ {}", rung.side, rung.size, rung.price)
            }
            OrderOp::Edit {
                id, price, size, ..
            } => write!(f, "edit {} -> {} @ {}", id, size, price),
            OrderOp::Cancel { id, .. } => write!(f, "cancel {}", id),
        }
    }
}

/// Minimum-change thresholds below which an edit is skipped entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileParams {
    /// Price delta below which a rung counts as unchanged
    pub min_price_change: f64,
    /// Size delta below which a rung counts as unchanged
    pub min_size_change: f64,
}

impl Default for ReconcileParams {
    fn default() -> Self {
        Self {
            min_price_change: 1e-9,
            min_size_change: 1e-9,
        }
    }
}

/// Compute the operations that converge `live` to `ladder`.
///
/// Per side, at most `max(live, desired)` operations are emitted, so the
/// total never exceeds 2N. Reconciling an already-converged set yields an
/// empty list. Operations come out in rank order, buys first.
pub fn reconcile(live: &[Order], ladder: &Ladder, params: &ReconcileParams) -> Vec<OrderOp> {
    let mut ops = Vec::new();
    for side in [Side::Buy, Side::Sell] {
        let live_side: Vec<&Order> = live
            .iter()
            .filter(|o| o.side == side && !o.status.is_terminal() && o.id.is_some())
            .collect();
        reconcile_side(
            ladder.reference_price,
            side,
            &live_side,
            ladder.side(side),
            params,
            &mut ops,
        );
    }
    ops
}

fn reconcile_side(
    reference: f64,
    side: Side,
    live: &[&Order],
    desired: &[Rung],
    params: &ReconcileParams,
    ops: &mut Vec<OrderOp>,
) {
    let mut live_ranked: Vec<&Order> = live.to_vec();
    live_ranked.sort_by(|a, b| rank_order(side, a.price, b.price, reference));

    let mut desired_ranked: Vec<&Rung> = desired.iter().collect();
    desired_ranked.sort_by(|a, b| rank_order(side, a.price, b.price, reference));

    let paired = live_ranked.len().min(desired_ranked.len());

    for rank in 0..paired {
        let order = live_ranked[rank];
        let rung = desired_ranked[rank];
        let price_changed = (order.price - rung.price).abs() > params.min_price_change;
        let size_changed = (order.size - rung.size).abs() > params.min_size_change;
        if price_changed || size_changed {
            ops.push(OrderOp::Edit {
                // filtered on id.is_some() above
                id: order.id.clone().unwrap_or_default(),
                side,
                price: rung.price,
                size: rung.size,
            });
        }
    }

    // Ladder shrank: surplus live ranks are canceled
    for order in &live_ranked[paired..] {
        ops.push(OrderOp::Cancel {
            id: order.id.clone().unwrap_or_default(),
            side,
        });
    }

    // Ladder grew: missing ranks are placed
    for rung in &desired_ranked[paired..] {
        ops.push(OrderOp::Place(**rung));
    }
}

/// Rank comparator: distance from the reference price ascending. Equidistant
/// entries break toward the lower price on the buy side and the higher price
/// on the sell side, so repeated cycles never flip the pairing.
fn rank_order(side: Side, a: f64, b: f64, reference: f64) -> Ordering {
    let da = (a - reference).abs();
    let db = (b - reference).abs();
    da.partial_cmp(&db)
        .unwrap_or(Ordering::Equal)
        .then_with(|| match side {
            Side::Buy => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            Side::Sell => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ladder::{build_ladder, LadderParams};
    use crate::types::OrderStatus;

    fn order(id: &str, side: Side, price: f64, size: f64) -> Order {
        Order::open(id, side, price, size)
    }

    fn scenario_ladder(reference: f64) -> Ladder {
        let params = LadderParams {
            bid_spread_bps: 10.0,
            ask_spread_bps: 10.0,
            rung_increment: 5.0,
            rungs_per_side: 5,
            min_order: 0.001,
            max_order: 1_000_000.0,
        };
        build_ladder(reference, 100.0, 100.0, &params).unwrap()
    }

    #[test]
    fn test_converged_set_yields_no_ops() {
        let ladder = scenario_ladder(50_000.0);
        let live: Vec<Order> = ladder
            .bids
            .iter()
            .chain(ladder.asks.iter())
            .enumerate()
            .map(|(i, r)| order(&format!("O{}", i), r.side, r.price, r.size))
            .collect();

        let ops = reconcile(&live, &ladder, &ReconcileParams::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_single_rank_price_change_is_one_edit() {
        let ladder = scenario_ladder(50_000.0);
        // Buy ranks 0..2 live; rank 1 rests at a stale price
        let live = vec![
            order("B0", Side::Buy, 49950.0, 20.0),
            order("B1", Side::Buy, 49944.0, 20.0),
            order("B2", Side::Buy, 49940.0, 20.0),
        ];
        let mut ladder = ladder;
        ladder.bids.truncate(3);
        ladder.asks.clear();

        let ops = reconcile(&live, &ladder, &ReconcileParams::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(
            ops[0],
            OrderOp::Edit {
                id: "B1".to_string(),
                side: Side::Buy,
                price: 49945.0,
                size: 20.0,
            }
        );
    }

    #[test]
    fn test_empty_live_set_places_everything() {
        let ladder = scenario_ladder(50_000.0);
        let ops = reconcile(&[], &ladder, &ReconcileParams::default());
        assert_eq!(ops.len(), 10);
        assert!(ops.iter().all(|op| matches!(op, OrderOp::Place(_))));
    }

    #[test]
    fn test_shrunk_ladder_cancels_surplus() {
        let live = vec![
            order("B0", Side::Buy, 49950.0, 20.0),
            order("B1", Side::Buy, 49945.0, 20.0),
            order("B2", Side::Buy, 49940.0, 20.0),
        ];
        let mut ladder = Ladder::empty(50_000.0);
        ladder.bids.push(Rung::new(Side::Buy, 49950.0, 20.0));

        let ops = reconcile(&live, &ladder, &ReconcileParams::default());
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, OrderOp::Cancel { .. })));
        let ids: Vec<&str> = ops
            .iter()
            .map(|op| match op {
                OrderOp::Cancel { id, .. } => id.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec!["B1", "B2"]);
    }

    #[test]
    fn test_shifted_ladder_prefers_edits() {
        // Reference moved 50 up: every rung shifts, but ranks still pair
        let old = scenario_ladder(50_000.0);
        let new = scenario_ladder(50_050.0);
        let live: Vec<Order> = old
            .bids
            .iter()
            .chain(old.asks.iter())
            .enumerate()
            .map(|(i, r)| order(&format!("O{}", i), r.side, r.price, r.size))
            .collect();

        let ops = reconcile(&live, &new, &ReconcileParams::default());
        assert_eq!(ops.len(), 10);
        assert!(ops.iter().all(|op| matches!(op, OrderOp::Edit { .. })));
    }

    #[test]
    fn test_minimality_bound() {
        let ladder = scenario_ladder(50_000.0);
        let live = vec![
            order("B0", Side::Buy, 48000.0, 1.0),
            order("S0", Side::Sell, 52000.0, 1.0),
        ];
        let ops = reconcile(&live, &ladder, &ReconcileParams::default());
        // never more than max(live, desired) per side
        assert!(ops.len() <= 10);
    }

    #[test]
    fn test_sub_threshold_changes_are_skipped() {
        let mut ladder = Ladder::empty(50_000.0);
        ladder.bids.push(Rung::new(Side::Buy, 49950.004, 20.0));
        let live = vec![order("B0", Side::Buy, 49950.0, 20.0)];

        let params = ReconcileParams {
            min_price_change: 0.01,
            min_size_change: 0.01,
        };
        assert!(reconcile(&live, &ladder, &params).is_empty());
    }

    #[test]
    fn test_terminal_orders_ignored() {
        let ladder = {
            let mut l = Ladder::empty(50_000.0);
            l.bids.push(Rung::new(Side::Buy, 49950.0, 20.0));
            l
        };
        let mut closed = order("B0", Side::Buy, 49950.0, 20.0);
        closed.status = OrderStatus::Closed;

        let ops = reconcile(&[closed], &ladder, &ReconcileParams::default());
        // the closed order no longer occupies the rank, so it gets re-placed
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], OrderOp::Place(_)));
    }

    #[test]
    fn test_rank_tie_break_is_stable() {
        // Two buys equidistant from the reference: lower price ranks closer
        let mut ladder = Ladder::empty(100.0);
        ladder.bids.push(Rung::new(Side::Buy, 99.0, 1.0));
        ladder.bids.push(Rung::new(Side::Buy, 98.0, 1.0));

        let live = vec![
            order("HI", Side::Buy, 99.0, 1.0),
            order("LO", Side::Buy, 98.0, 1.0),
        ];
        // ladder rungs are 1.0 and 2.0 away; live matches exactly
        let ops = reconcile(&live, &ladder, &ReconcileParams::default());
        assert!(ops.is_empty());
    }
}
