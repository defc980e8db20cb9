use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCreatedEvent,
    PaymentStatusChangedEvent,
    ShippingStatusChangedEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub payment_status_producer: Vec<EventProducer<PaymentStatusChangedEvent>>,
    pub shipping_status_producer: Vec<EventProducer<ShippingStatusChangedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payment_status_changed(&self, event: PaymentStatusChangedEvent) {
        for producer in &self.payment_status_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_shipping_status_changed(&self, event: ShippingStatusChangedEvent) {
        for producer in &self.shipping_status_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_payment_status_changed: Option<EventHandler<PaymentStatusChangedEvent>>,
    pub on_shipping_status_changed: Option<EventHandler<ShippingStatusChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_payment_status_changed = hooks.on_payment_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_shipping_status_changed = hooks.on_shipping_status_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_created, on_payment_status_changed, on_shipping_status_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_status_changed {
            result.payment_status_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_shipping_status_changed {
            result.shipping_status_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns each configured handler on the tokio runtime. Handlers run until every producer has been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_shipping_status_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_payment_status_changed: Option<Handler<PaymentStatusChangedEvent>>,
    pub on_shipping_status_changed: Option<Handler<ShippingStatusChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_payment_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_shipping_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ShippingStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_shipping_status_changed = Some(Arc::new(f));
        self
    }
}
