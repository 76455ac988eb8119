/// Kitchen -> delivery: an order's item is prepared
pub const ORDER_PREPARED: &str = "order-prepared";
/// Payments -> delivery: an order's payment completed
pub const PAYMENT_COMPLETED: &str = "payment-completed";
/// Delivery -> fleet: both facts are in, the order can be picked up
pub const ORDER_READY_FOR_DELIVER: &str = "order-ready-for-deliver";
/// Delivery -> everyone: the order was handed over
pub const ORDER_DELIVERED: &str = "order-delivered";

pub const INBOUND: [&str; 2] = [ORDER_PREPARED, PAYMENT_COMPLETED];
