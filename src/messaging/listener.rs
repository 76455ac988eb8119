use std::sync::Arc;

use crate::delivery::{Correlator, DeliveryError, JoinOutcome, PreparedFact};
use crate::metrics::Metrics;
use crate::models::{DomainEvent, OrderItemPreparedEvent, PaymentEvent};

// ============================================================================
// Delivery Listener - inbound adapters for the two order facts
// ============================================================================
//
// Each handler: decode -> record -> acknowledge -> join.
// A decode failure returns before anything is recorded or acknowledged.
// Once acknowledged, a failing join publish is reported but the broker will
// not redeliver the message.
//
// ============================================================================

/// Tells the broker a message does not need redelivery
pub trait Acknowledgment: Send + Sync {
    fn acknowledge(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    Prepared,
    Payment,
}

impl FactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FactKind::Prepared => "prepared",
            FactKind::Payment => "payment",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Failed to decode {} event: {source}", .kind.as_str())]
    Decode {
        kind: FactKind,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

pub struct DeliveryListener {
    correlator: Arc<Correlator>,
    metrics: Arc<Metrics>,
}

impl DeliveryListener {
    pub fn new(correlator: Arc<Correlator>, metrics: Arc<Metrics>) -> Self {
        Self { correlator, metrics }
    }

    pub async fn on_order_prepared(&self, payload: &str, ack: &dyn Acknowledgment) -> Result<JoinOutcome, ListenerError> {
        let event: OrderItemPreparedEvent = self.decode(FactKind::Prepared, payload)?;

        tracing::info!(
            order_id = %event.order_id(),
            event_type = %event.event_type(),
            item_type = %event.item_type,
            quantity = event.quantity,
            "Order prepared received"
        );

        let pending = self
            .correlator
            .record_prepared(event.order_id(), PreparedFact::from(&event));
        self.metrics.record_received(FactKind::Prepared.as_str());

        ack.acknowledge();
        tracing::debug!(order_id = %pending.order_id(), "Acknowledged, attempting join");

        Ok(pending.join().await?)
    }

    pub async fn on_payment_completed(&self, payload: &str, ack: &dyn Acknowledgment) -> Result<JoinOutcome, ListenerError> {
        let event: PaymentEvent = self.decode(FactKind::Payment, payload)?;

        // status is not inspected: every payment event counts as settled
        tracing::info!(
            order_id = %event.order_id(),
            event_type = %event.event_type(),
            status = %event.status,
            amount = %event.amount,
            "Payment completed received"
        );

        let pending = self.correlator.record_payment(event.order_id());
        self.metrics.record_received(FactKind::Payment.as_str());

        ack.acknowledge();
        tracing::debug!(order_id = %pending.order_id(), "Acknowledged, attempting join");

        Ok(pending.join().await?)
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, kind: FactKind, payload: &str) -> Result<T, ListenerError> {
        serde_json::from_str(payload).map_err(|source| {
            tracing::error!(kind = kind.as_str(), error = %source, "Rejecting undecodable message");
            self.metrics.record_decode_failure(kind.as_str());
            ListenerError::Decode { kind, source }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::ReadyEmission;
    use crate::messaging::topics::ORDER_READY_FOR_DELIVER;
    use crate::messaging::InMemoryPublisher;
    use crate::models::READY_MESSAGE;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingAck(AtomicU32);

    impl Acknowledgment for CountingAck {
        fn acknowledge(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingAck {
        fn count(&self) -> u32 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn setup() -> (DeliveryListener, Arc<Correlator>, Arc<InMemoryPublisher>, Arc<Metrics>) {
        let publisher = Arc::new(InMemoryPublisher::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let correlator = Arc::new(Correlator::new(publisher.clone(), metrics.clone(), ReadyEmission::Once));
        let listener = DeliveryListener::new(correlator.clone(), metrics.clone());
        (listener, correlator, publisher, metrics)
    }

    fn prepared_json(order_id: &str) -> String {
        serde_json::json!({
            "orderId": order_id,
            "userId": "u1",
            "itemType": "pizza",
            "quantity": 1,
            "address": "addr",
            "completedTime": "2024-05-01T12:00:00"
        })
        .to_string()
    }

    fn payment_json(order_id: &str) -> String {
        serde_json::json!({
            "orderId": order_id,
            "userId": "u1",
            "status": "SUCCESS",
            "amount": 10.0
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_prepared_stores_state_and_acknowledges() {
        let (listener, correlator, publisher, metrics) = setup();
        let ack = CountingAck::default();

        let outcome = listener.on_order_prepared(&prepared_json("o1"), &ack).await.unwrap();

        assert_eq!(outcome, JoinOutcome::Waiting);
        assert_eq!(ack.count(), 1);
        assert!(correlator.store().get("o1").unwrap().prepared.is_some());
        assert!(publisher.sent().is_empty());
        assert_eq!(metrics.events_received.with_label_values(&["prepared"]).get(), 1);
    }

    #[tokio::test]
    async fn test_payment_marks_paid_and_acknowledges() {
        let (listener, correlator, publisher, _) = setup();
        let ack = CountingAck::default();

        listener.on_payment_completed(&payment_json("o2"), &ack).await.unwrap();

        assert_eq!(ack.count(), 1);
        assert!(correlator.store().get("o2").unwrap().payment_done);
        assert!(publisher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_both_facts_publish_ready() {
        let (listener, _, publisher, _) = setup();
        let ack = CountingAck::default();

        listener.on_order_prepared(&prepared_json("o3"), &ack).await.unwrap();
        let outcome = listener.on_payment_completed(&payment_json("o3"), &ack).await.unwrap();

        assert_eq!(outcome, JoinOutcome::Published);
        assert_eq!(ack.count(), 2);
        let ready = publisher.sent_to(ORDER_READY_FOR_DELIVER);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].order_id, "o3");
        assert_eq!(ready[0].message, READY_MESSAGE);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_not_acknowledged() {
        let (listener, correlator, _, metrics) = setup();
        let ack = CountingAck::default();

        let result = listener.on_payment_completed("{not json", &ack).await;

        assert!(matches!(result, Err(ListenerError::Decode { kind: FactKind::Payment, .. })));
        assert_eq!(ack.count(), 0);
        assert!(correlator.store().is_empty());
        assert_eq!(metrics.decode_failures.with_label_values(&["payment"]).get(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_happens_after_ack() {
        let (listener, correlator, publisher, _) = setup();
        let ack = CountingAck::default();
        listener.on_order_prepared(&prepared_json("o4"), &ack).await.unwrap();
        publisher.set_failing(true);

        let result = listener.on_payment_completed(&payment_json("o4"), &ack).await;

        assert!(matches!(result, Err(ListenerError::Delivery(_))));
        assert_eq!(ack.count(), 2);
        assert!(correlator.store().get("o4").unwrap().is_ready());
    }
}
