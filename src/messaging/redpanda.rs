use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use std::sync::Arc;
use std::time::Duration;

use super::publisher::{EventPublisher, PublishError};
use crate::metrics::Metrics;
use crate::models::OrderReadyForDeliveryEvent;
use crate::utils::{
    retry_on_transient, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState, RetryConfig,
};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON producer for outbound delivery notifications
pub struct RedpandaClient {
    producer: FutureProducer,
    circuit_breaker: CircuitBreaker,
    retry: RetryConfig,
}

impl RedpandaClient {
    pub fn new(brokers: &str, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()?;

        let circuit_breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 3,
        })
        .with_observer(move |state| metrics.update_circuit_breaker_state(state.as_gauge()));

        tracing::info!(brokers = %brokers, "Redpanda producer created");

        Ok(Self {
            producer,
            circuit_breaker,
            retry: RetryConfig::conservative(),
        })
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.get_state().await
    }

    async fn send_once(&self, topic: &str, key: &str, payload: &str) -> Result<(), PublishError> {
        let result = self
            .circuit_breaker
            .call(async {
                let record = FutureRecord::to(topic).key(key).payload(payload);
                self.producer
                    .send(record, Timeout::After(SEND_TIMEOUT))
                    .await
                    .map(|_| ())
                    .map_err(|(e, _)| PublishError::Broker(e.to_string()))
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(CircuitBreakerError::CircuitOpen) => Err(PublishError::CircuitOpen),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }
}

#[async_trait]
impl EventPublisher for RedpandaClient {
    async fn publish(&self, topic: &str, event: &OrderReadyForDeliveryEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)?;
        let key = event.order_id.as_str();

        let result = retry_on_transient(&self.retry, |_attempt| self.send_once(topic, key, &payload)).await;

        match &result {
            Ok(()) => tracing::info!(
                topic = %topic,
                order_id = %key,
                "Published to Redpanda"
            ),
            Err(PublishError::CircuitOpen) => tracing::error!(
                topic = %topic,
                order_id = %key,
                "Circuit breaker open - Redpanda unavailable"
            ),
            Err(e) => tracing::error!(
                error = %e,
                topic = %topic,
                order_id = %key,
                "Failed to publish to Redpanda"
            ),
        }

        result
    }
}
