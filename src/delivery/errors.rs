use crate::messaging::PublishError;

// ============================================================================
// Delivery Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to publish to {topic}: {source}")]
    Publish {
        topic: &'static str,
        #[source]
        source: PublishError,
    },
}
