use chrono::{DateTime, NaiveDateTime, Utc};

use crate::models::{OrderItemPreparedEvent, OrderReadyForDeliveryEvent};

// ============================================================================
// Per-Order State
// ============================================================================

/// Fields of the "item prepared" fact that survive into outbound events
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFact {
    pub user_id: String,
    pub item_type: String,
    pub address: String,
    pub completed_time: NaiveDateTime,
}

impl From<&OrderItemPreparedEvent> for PreparedFact {
    fn from(event: &OrderItemPreparedEvent) -> Self {
        Self {
            user_id: event.user_id.clone(),
            item_type: event.item_type.clone(),
            address: event.address.clone(),
            completed_time: event.completed_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// One or neither fact recorded, or both recorded but not yet announced
    Awaiting,
    /// "Ready for delivery" has been announced
    Ready,
    /// Handed over; the state is about to leave the store
    Delivered,
}

/// How often a satisfied readiness predicate turns into a published event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyEmission {
    /// Only on the Awaiting -> Ready transition
    #[default]
    Once,
    /// On every join attempt where both facts are present
    EveryJoin,
}

#[derive(Debug, Clone)]
pub struct OrderState {
    pub order_id: String,
    pub prepared: Option<PreparedFact>,
    pub payment_done: bool,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderState {
    pub fn new(order_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            order_id: order_id.into(),
            prepared: None,
            payment_done: false,
            lifecycle: Lifecycle::Awaiting,
            created_at: now,
            updated_at: now,
        }
    }

    /// Both facts are present
    pub fn is_ready(&self) -> bool {
        self.payment_done && self.prepared.is_some()
    }

    /// Last write wins. Returns true when an earlier, different fact was replaced.
    pub fn record_prepared(&mut self, fact: PreparedFact) -> bool {
        let replaced = self.prepared.as_ref().is_some_and(|previous| *previous != fact);
        self.prepared = Some(fact);
        self.updated_at = Utc::now();
        replaced
    }

    pub fn record_payment(&mut self) {
        self.payment_done = true;
        self.updated_at = Utc::now();
    }

    /// Decides whether this join attempt should publish, advancing the
    /// lifecycle when it does.
    pub fn claim_ready(&mut self, emission: ReadyEmission) -> bool {
        if !self.is_ready() {
            return false;
        }

        match (emission, self.lifecycle) {
            (_, Lifecycle::Delivered) => false,
            (_, Lifecycle::Awaiting) => {
                self.lifecycle = Lifecycle::Ready;
                true
            }
            (ReadyEmission::EveryJoin, Lifecycle::Ready) => true,
            (ReadyEmission::Once, Lifecycle::Ready) => false,
        }
    }

    pub fn mark_delivered(&mut self) {
        self.lifecycle = Lifecycle::Delivered;
    }

    /// Builds the outbound notification. `None` until the prepared fact exists.
    pub fn to_event(&self, message: &str) -> Option<OrderReadyForDeliveryEvent> {
        let fact = self.prepared.as_ref()?;
        Some(OrderReadyForDeliveryEvent {
            order_id: self.order_id.clone(),
            user_id: fact.user_id.clone(),
            address: fact.address.clone(),
            item: fact.item_type.clone(),
            ready_time: fact.completed_time,
            message: message.to_string(),
        })
    }
}
