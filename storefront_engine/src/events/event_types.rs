use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderDetail, PaymentStatus, ShippingStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: OrderDetail,
}

impl OrderCreatedEvent {
    pub fn new(order: OrderDetail) -> Self {
        Self { order }
    }
}

/// Emitted whenever a payment status is written. Re-applying the current status is a no-op and emits nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusChangedEvent {
    pub order: Order,
    pub old_status: PaymentStatus,
}

impl PaymentStatusChangedEvent {
    pub fn new(order: Order, old_status: PaymentStatus) -> Self {
        Self { order, old_status }
    }

    pub fn new_status(&self) -> PaymentStatus {
        self.order.payment_status
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingStatusChangedEvent {
    pub order: Order,
    pub old_status: ShippingStatus,
}

impl ShippingStatusChangedEvent {
    pub fn new(order: Order, old_status: ShippingStatus) -> Self {
        Self { order, old_status }
    }

    pub fn new_status(&self) -> ShippingStatus {
        self.order.shipping_status
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    PaymentStatusChanged(PaymentStatusChangedEvent),
    ShippingStatusChanged(ShippingStatusChangedEvent),
}
