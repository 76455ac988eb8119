use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::models::OrderReadyForDeliveryEvent;
use crate::utils::IsTransient;

// ============================================================================
// Event Publisher - the outbound seam of the correlator
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Broker rejected message: {0}")]
    Broker(String),

    #[error("Circuit breaker open for broker")]
    CircuitOpen,
}

impl IsTransient for PublishError {
    fn is_transient(&self) -> bool {
        matches!(self, PublishError::Broker(_))
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Send `event` to `topic`, keyed by its order id
    async fn publish(&self, topic: &str, event: &OrderReadyForDeliveryEvent) -> Result<(), PublishError>;
}

/// Keeps published events in memory. Used by tests and local runs without a broker.
#[derive(Default)]
pub struct InMemoryPublisher {
    sent: Mutex<Vec<(String, OrderReadyForDeliveryEvent)>>,
    failing: AtomicBool,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail with a broker error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, OrderReadyForDeliveryEvent)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, topic: &str) -> Vec<OrderReadyForDeliveryEvent> {
        self.sent()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, event)| event)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, topic: &str, event: &OrderReadyForDeliveryEvent) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Broker("in-memory publisher set to fail".to_string()));
        }

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| PublishError::Broker("in-memory publisher poisoned".to_string()))?;
        sent.push((topic.to_string(), event.clone()));
        Ok(())
    }
}
