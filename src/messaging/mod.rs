mod consumer;
mod listener;
mod publisher;
mod redpanda;
pub mod topics;

pub use consumer::{create_consumer, run_consumer, ConsumerSettings};
pub use listener::{Acknowledgment, DeliveryListener, FactKind, ListenerError};
pub use publisher::{EventPublisher, InMemoryPublisher, PublishError};
pub use redpanda::RedpandaClient;
