use std::sync::Arc;

use crate::messaging::topics::{ORDER_DELIVERED, ORDER_READY_FOR_DELIVER};
use crate::messaging::EventPublisher;
use crate::metrics::Metrics;
use crate::models::{DELIVERED_MESSAGE, READY_MESSAGE};
use super::errors::DeliveryError;
use super::state::{PreparedFact, ReadyEmission};
use super::store::StateStore;

// ============================================================================
// Correlator - joins "item prepared" and "payment completed" per order
// ============================================================================
//
// Recording a fact and announcing readiness are split: the record call mutates
// the store and hands back a PendingJoin, so the inbound adapter can
// acknowledge the broker message before the join publishes anything.
//
// Lifecycle per order:
//   NEW -> AWAITING -> READY -> DELIVERED (removed)
//
// A fact arriving after delivery starts a fresh NEW state.
//
// ============================================================================

pub const NOT_READY_MESSAGE: &str = "Order not ready for delivery yet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    NotReady,
    Delivered { order_id: String },
}

impl DeliveryOutcome {
    /// Plain-text body returned to the manual trigger
    pub fn message(&self) -> String {
        match self {
            DeliveryOutcome::NotReady => NOT_READY_MESSAGE.to_string(),
            DeliveryOutcome::Delivered { order_id } => format!("Order delivered for orderId {}", order_id),
        }
    }
}

/// What a join attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Predicate unmet, or readiness already announced
    Waiting,
    Published,
}

pub struct Correlator {
    store: StateStore,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    emission: ReadyEmission,
}

impl Correlator {
    pub fn new(publisher: Arc<dyn EventPublisher>, metrics: Arc<Metrics>, emission: ReadyEmission) -> Self {
        Self {
            store: StateStore::new(),
            publisher,
            metrics,
            emission,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    #[must_use = "the join attempt only runs when PendingJoin::join is awaited"]
    pub fn record_prepared(&self, order_id: &str, fact: PreparedFact) -> PendingJoin<'_> {
        let replaced = self.store.update(order_id, |state| state.record_prepared(fact));
        if replaced {
            tracing::warn!(order_id = %order_id, "Prepared fact replaced by a newer one");
        }
        tracing::info!(order_id = %order_id, "Order prepared recorded");
        self.after_record(order_id)
    }

    #[must_use = "the join attempt only runs when PendingJoin::join is awaited"]
    pub fn record_payment(&self, order_id: &str) -> PendingJoin<'_> {
        self.store.update(order_id, |state| state.record_payment());
        tracing::info!(order_id = %order_id, "Payment completed recorded");
        self.after_record(order_id)
    }

    fn after_record(&self, order_id: &str) -> PendingJoin<'_> {
        self.metrics.set_tracked_orders(self.store.len());
        PendingJoin {
            correlator: self,
            order_id: order_id.to_string(),
        }
    }

    async fn attempt_join(&self, order_id: &str) -> Result<JoinOutcome, DeliveryError> {
        // Predicate and lifecycle transition are decided under the key's lock;
        // the publish happens after it is released.
        let event = self
            .store
            .update_existing(order_id, |state| {
                if state.claim_ready(self.emission) {
                    state.to_event(READY_MESSAGE)
                } else {
                    None
                }
            })
            .flatten();

        let Some(event) = event else {
            tracing::debug!(order_id = %order_id, "Order not ready yet");
            return Ok(JoinOutcome::Waiting);
        };

        tracing::info!(order_id = %order_id, "Order ready for delivery (prepared + paid)");
        self.publish(ORDER_READY_FOR_DELIVER, &event).await?;
        self.metrics.ready_published.inc();
        Ok(JoinOutcome::Published)
    }

    /// Manual delivery trigger. Retires the order when both facts are present.
    pub async fn deliver(&self, order_id: &str) -> Result<DeliveryOutcome, DeliveryError> {
        let Some(mut state) = self.store.remove_if(order_id, |state| state.is_ready()) else {
            tracing::info!(order_id = %order_id, "Delivery requested for order that is not ready");
            self.metrics.not_ready.inc();
            return Ok(DeliveryOutcome::NotReady);
        };
        self.metrics.set_tracked_orders(self.store.len());

        state.mark_delivered();
        let Some(event) = state.to_event(DELIVERED_MESSAGE) else {
            // remove_if only hands back ready states
            tracing::error!(
                order_id = %order_id,
                payment_done = state.payment_done,
                prepared = state.prepared.is_some(),
                "Removed order has no prepared fact, delivered event dropped"
            );
            return Ok(DeliveryOutcome::NotReady);
        };

        self.publish(ORDER_DELIVERED, &event).await?;
        self.metrics.delivered.inc();

        tracing::info!(
            order_id = %order_id,
            lifecycle = ?state.lifecycle,
            "Order delivered"
        );

        Ok(DeliveryOutcome::Delivered {
            order_id: order_id.to_string(),
        })
    }

    /// TTL eviction of orders that never completed
    pub fn evict_older_than(&self, cutoff: chrono::DateTime<chrono::Utc>) -> usize {
        let evicted = self.store.evict_older_than(cutoff);
        if evicted > 0 {
            self.metrics.evicted_orders.inc_by(evicted as u64);
            self.metrics.set_tracked_orders(self.store.len());
        }
        evicted
    }

    async fn publish(
        &self,
        topic: &'static str,
        event: &crate::models::OrderReadyForDeliveryEvent,
    ) -> Result<(), DeliveryError> {
        self.publisher.publish(topic, event).await.map_err(|source| {
            tracing::error!(
                order_id = %event.order_id,
                topic = %topic,
                error = %source,
                "Publish failed, state change is kept"
            );
            self.metrics.record_publish_failure(topic);
            DeliveryError::Publish { topic, source }
        })
    }
}

/// A recorded fact whose join attempt has not run yet
pub struct PendingJoin<'a> {
    correlator: &'a Correlator,
    order_id: String,
}

impl PendingJoin<'_> {
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub async fn join(self) -> Result<JoinOutcome, DeliveryError> {
        self.correlator.attempt_join(&self.order_id).await
    }
}
