use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::state::OrderState;

// ============================================================================
// State Store - concurrent keyed map of in-flight orders
// ============================================================================
//
// Sharded map: different order ids rarely contend, the same order id is
// serialized by its shard lock. Closures passed in run under that lock, so
// they must not block or await.
//
// ============================================================================

#[derive(Default)]
pub struct StateStore {
    orders: DashMap<String, OrderState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch-or-create the state for `order_id` and mutate it atomically.
    pub fn update<R>(&self, order_id: &str, f: impl FnOnce(&mut OrderState) -> R) -> R {
        let mut entry = self
            .orders
            .entry(order_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(order_id = %order_id, "Tracking new order");
                OrderState::new(order_id)
            });
        f(entry.value_mut())
    }

    /// Mutate existing state only. `None` when the order is not tracked.
    pub fn update_existing<R>(&self, order_id: &str, f: impl FnOnce(&mut OrderState) -> R) -> Option<R> {
        self.orders.get_mut(order_id).map(|mut entry| f(entry.value_mut()))
    }

    /// Snapshot of the current state, without creating it
    pub fn get(&self, order_id: &str) -> Option<OrderState> {
        self.orders.get(order_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, order_id: &str) -> Option<OrderState> {
        self.orders.remove(order_id).map(|(_, state)| state)
    }

    /// Atomic check-and-remove
    pub fn remove_if(&self, order_id: &str, predicate: impl FnOnce(&OrderState) -> bool) -> Option<OrderState> {
        self.orders
            .remove_if(order_id, |_, state| predicate(state))
            .map(|(_, state)| state)
    }

    /// Drops every order whose first fact arrived before `cutoff`
    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.orders.len();
        self.orders.retain(|order_id, state| {
            let keep = state.created_at >= cutoff;
            if !keep {
                tracing::warn!(
                    order_id = %order_id,
                    payment_done = state.payment_done,
                    prepared = state.prepared.is_some(),
                    created_at = %state.created_at,
                    "Evicting undelivered order"
                );
            }
            keep
        });
        before.saturating_sub(self.orders.len())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
