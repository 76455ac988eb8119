use futures_util::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Message},
};
use std::sync::Arc;

use super::listener::{Acknowledgment, DeliveryListener};
use super::topics::{self, ORDER_PREPARED, PAYMENT_COMPLETED};

// ============================================================================
// Inbound Consumer - feeds broker messages to the delivery listener
// ============================================================================
//
// Manual offset commits: the listener's acknowledgment is the commit, so a
// message whose payload cannot be decoded is never committed by us. Several
// workers may join the same consumer group, each owning its partitions.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct ConsumerSettings {
    pub brokers: String,
    pub group_id: String,
    pub auto_offset_reset: String,
}

/// Commits the offset of one consumed message
struct KafkaAck<'a, 'm> {
    consumer: &'a StreamConsumer,
    message: &'a BorrowedMessage<'m>,
}

impl Acknowledgment for KafkaAck<'_, '_> {
    fn acknowledge(&self) {
        if let Err(e) = self.consumer.commit_message(self.message, CommitMode::Async) {
            tracing::warn!(
                topic = self.message.topic(),
                partition = self.message.partition(),
                offset = self.message.offset(),
                error = %e,
                "Failed to commit offset (message may be redelivered)"
            );
        }
    }
}

pub fn create_consumer(settings: &ConsumerSettings) -> anyhow::Result<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &settings.brokers)
        .set("group.id", &settings.group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", &settings.auto_offset_reset)
        .set("session.timeout.ms", "6000")
        .set("enable.partition.eof", "false")
        .create()?;

    consumer.subscribe(&topics::INBOUND)?;

    tracing::info!(
        topics = ?topics::INBOUND,
        group_id = %settings.group_id,
        auto_offset_reset = %settings.auto_offset_reset,
        "Subscribed to inbound topics"
    );

    Ok(consumer)
}

/// Consume until the stream ends. One call per worker.
pub async fn run_consumer(worker: usize, consumer: StreamConsumer, listener: Arc<DeliveryListener>) {
    tracing::info!(worker, "Consumer worker started");
    let mut stream = consumer.stream();

    while let Some(next) = stream.next().await {
        let message = match next {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(worker, error = %e, "Failed to receive message");
                continue;
            }
        };

        let Some(payload) = message.payload_view::<str>() else {
            tracing::warn!(
                worker,
                topic = message.topic(),
                offset = message.offset(),
                "Skipping message without payload"
            );
            continue;
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(worker, topic = message.topic(), error = %e, "Payload is not UTF-8");
                continue;
            }
        };

        let ack = KafkaAck {
            consumer: &consumer,
            message: &message,
        };

        let result = match message.topic() {
            ORDER_PREPARED => listener.on_order_prepared(payload, &ack).await,
            PAYMENT_COMPLETED => listener.on_payment_completed(payload, &ack).await,
            other => {
                tracing::warn!(worker, topic = other, "Message from unexpected topic");
                continue;
            }
        };

        if let Err(e) = result {
            tracing::error!(
                worker,
                topic = message.topic(),
                partition = message.partition(),
                offset = message.offset(),
                error = %e,
                "Failed to handle inbound message"
            );
        }
    }

    tracing::info!(worker, "Consumer worker exiting");
}
