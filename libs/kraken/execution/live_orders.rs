//! Live order set.
//!
//! The single owner of order state for one pair. Mutated only from
//! confirmed venue responses (via the execution engine) and from the
//! startup open-order sync; everything else reads snapshots.

use crate::types::{Order, OrderStatus, Side};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

/// Shared handle to the live order set
pub type SharedLiveOrders = Arc<RwLock<LiveOrders>>;

/// In-memory mirror of the orders resting at the venue for one pair.
///
/// Invariants: at most `max_per_side` non-terminal orders per side, and no
/// two orders on the same side at the same price.
#[derive(Debug)]
pub struct LiveOrders {
    orders: Vec<Order>,
    max_per_side: usize,
}

impl LiveOrders {
    pub fn new(max_per_side: usize) -> Self {
        Self {
            orders: Vec::new(),
            max_per_side,
        }
    }

    pub fn shared(max_per_side: usize) -> SharedLiveOrders {
        Arc::new(RwLock::new(Self::new(max_per_side)))
    }

    /// Replace the whole set from a venue snapshot (startup sync).
    pub fn replace_all(&mut self, orders: Vec<Order>) {
        self.orders = orders;
        self.purge_terminal();
    }

    /// Insert a confirmed open order.
    ///
    /// A stale entry at the same side and price is replaced; the venue
    /// cannot have both.
    pub fn insert_open(&mut self, order: Order) {
        self.insert(order);
    }

    /// Reserve a slot for a placement that is in flight. Counts against the
    /// per-side cap until it is confirmed or dropped.
    pub fn insert_pending(&mut self, side: Side, price: f64, size: f64) {
        self.insert(Order::pending(side, price, size));
    }

    /// Promote an in-flight placement to open with its venue id.
    /// Returns false if no pending order rests at that side and price.
    pub fn confirm_pending(&mut self, side: Side, price: f64, id: String) -> bool {
        match self
            .orders
            .iter_mut()
            .find(|o| o.side == side && o.price == price && o.status == OrderStatus::Pending)
        {
            Some(order) => {
                order.id = Some(id);
                order.status = OrderStatus::Open;
                true
            }
            None => false,
        }
    }

    /// Release the slot of an in-flight placement that failed.
    pub fn drop_pending(&mut self, side: Side, price: f64) {
        self.orders
            .retain(|o| !(o.side == side && o.price == price && o.status == OrderStatus::Pending));
    }

    fn insert(&mut self, order: Order) {
        if let Some(existing) = self
            .orders
            .iter_mut()
            .find(|o| o.side == order.side && o.price == order.price && !o.status.is_terminal())
        {
            warn!(
                "[LiveOrders] Replacing stale {} order at {} (id {:?})",
                existing.side, existing.price, existing.id
            );
            *existing = order;
            return;
        }

        if self.count(order.side) >= self.max_per_side {
            warn!(
                "[LiveOrders] {} side already holds {} orders, inserting anyway",
                order.side, self.max_per_side
            );
        }
        self.orders.push(order);
    }

    /// Flag a status transition (editing/canceling in flight, closed, ...).
    /// Returns false if no order carries the id.
    pub fn set_status(&mut self, id: &str, status: OrderStatus) -> bool {
        match self.find_mut(id) {
            Some(order) => {
                order.status = status;
                true
            }
            None => false,
        }
    }

    /// Apply a confirmed edit: new id, price, and size, back to open.
    pub fn apply_edit(&mut self, old_id: &str, new_id: String, price: f64, size: f64) -> bool {
        match self.find_mut(old_id) {
            Some(order) => {
                order.id = Some(new_id);
                order.price = price;
                order.size = size;
                order.status = OrderStatus::Open;
                true
            }
            None => false,
        }
    }

    /// Remove a canceled order from the set.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.orders.len();
        self.orders.retain(|o| o.id.as_deref() != Some(id));
        self.orders.len() != before
    }

    /// Drop closed and rejected orders. Runs before every reconciliation.
    pub fn purge_terminal(&mut self) {
        self.orders.retain(|o| !o.status.is_terminal());
    }

    /// Snapshot of all non-terminal orders.
    pub fn snapshot(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect()
    }

    /// Non-terminal orders on one side.
    pub fn count(&self, side: Side) -> usize {
        self.orders
            .iter()
            .filter(|o| o.side == side && !o.status.is_terminal())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.iter().all(|o| o.status.is_terminal())
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id.as_deref() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(id: &str, side: Side, price: f64) -> Order {
        Order::open(id, side, price, 1.0)
    }

    #[test]
    fn test_insert_and_count() {
        let mut live = LiveOrders::new(5);
        live.insert_open(open("A", Side::Buy, 99.0));
        live.insert_open(open("B", Side::Buy, 98.0));
        live.insert_open(open("C", Side::Sell, 101.0));
        assert_eq!(live.count(Side::Buy), 2);
        assert_eq!(live.count(Side::Sell), 1);
    }

    #[test]
    fn test_same_price_replaces() {
        let mut live = LiveOrders::new(5);
        live.insert_open(open("A", Side::Buy, 99.0));
        live.insert_open(open("B", Side::Buy, 99.0));
        assert_eq!(live.count(Side::Buy), 1);
        let snap = live.snapshot();
        assert_eq!(snap[0].id.as_deref(), Some("B"));
    }

    #[test]
    fn test_edit_replaces_id_in_place() {
        let mut live = LiveOrders::new(5);
        live.insert_open(open("OLD", Side::Buy, 99.0));
        live.set_status("OLD", OrderStatus::Editing);
        assert!(live.apply_edit("OLD", "NEW".to_string(), 98.5, 2.0));

        let snap = live.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].id.as_deref(), Some("NEW"));
        assert_eq!(snap[0].price, 98.5);
        assert_eq!(snap[0].status, OrderStatus::Open);
        // old id no longer resolves
        assert!(!live.set_status("OLD", OrderStatus::Closed));
    }

    #[test]
    fn test_pending_promotes_to_open_on_confirmation() {
        let mut live = LiveOrders::new(5);
        live.insert_pending(Side::Buy, 99.0, 1.0);
        // the in-flight slot already counts against the side
        assert_eq!(live.count(Side::Buy), 1);
        assert!(live.snapshot()[0].id.is_none());

        assert!(live.confirm_pending(Side::Buy, 99.0, "TX1".to_string()));
        let snap = live.snapshot();
        assert_eq!(snap[0].id.as_deref(), Some("TX1"));
        assert_eq!(snap[0].status, OrderStatus::Open);

        // nothing pending remains to confirm
        assert!(!live.confirm_pending(Side::Buy, 99.0, "TX2".to_string()));
    }

    #[test]
    fn test_dropped_pending_releases_the_slot() {
        let mut live = LiveOrders::new(5);
        live.insert_pending(Side::Sell, 101.0, 1.0);
        live.drop_pending(Side::Sell, 101.0);
        assert_eq!(live.count(Side::Sell), 0);
        assert!(live.is_empty());
    }

    #[test]
    fn test_purge_terminal() {
        let mut live = LiveOrders::new(5);
        live.insert_open(open("A", Side::Buy, 99.0));
        live.insert_open(open("B", Side::Buy, 98.0));
        live.set_status("A", OrderStatus::Closed);
        live.purge_terminal();
        assert_eq!(live.count(Side::Buy), 1);
        assert_eq!(live.snapshot()[0].id.as_deref(), Some("B"));
    }

    #[test]
    fn test_remove() {
        let mut live = LiveOrders::new(5);
        live.insert_open(open("A", Side::Sell, 101.0));
        assert!(live.remove("A"));
        assert!(!live.remove("A"));
        assert!(live.is_empty());
    }

    #[test]
    fn test_replace_all_drops_terminal() {
        let mut live = LiveOrders::new(5);
        let mut closed = open("X", Side::Buy, 95.0);
        closed.status = OrderStatus::Closed;
        live.replace_all(vec![open("A", Side::Buy, 99.0), closed]);
        assert_eq!(live.snapshot().len(), 1);
    }
}
