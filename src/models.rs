use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Wire Models
// Inbound facts from the kitchen and payment services, outbound notifications
// for the delivery fleet. Field names are camelCase on the wire.
// ============================================================================

pub const READY_MESSAGE: &str = "Order is ready for delivery!";
pub const DELIVERED_MESSAGE: &str = "Order is delivered!";

/// Base trait for inbound facts
pub trait DomainEvent {
    fn event_type(&self) -> &str;
    fn order_id(&self) -> &str;
}

/// Emitted by the kitchen once an order's item is ready to leave
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemPreparedEvent {
    pub order_id: String,
    pub user_id: String,
    pub item_type: String,
    pub quantity: i32,
    pub address: String,
    pub completed_time: NaiveDateTime,
}

impl DomainEvent for OrderItemPreparedEvent {
    fn event_type(&self) -> &str {
        "OrderItemPrepared"
    }

    fn order_id(&self) -> &str {
        &self.order_id
    }
}

/// Emitted by the payment service once a charge settles
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub amount: Decimal,
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &str {
        "PaymentCompleted"
    }

    fn order_id(&self) -> &str {
        &self.order_id
    }
}

/// Outbound notification. The same shape is published on the "ready" and the
/// "delivered" topics; only `message` differs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderReadyForDeliveryEvent {
    pub order_id: String,
    pub user_id: String,
    pub address: String,
    pub item: String,
    pub ready_time: NaiveDateTime,
    pub message: String,
}
