use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, PaymentSettledEvent, ReservationExpiredEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_settled_producer: Vec<EventProducer<PaymentSettledEvent>>,
    pub reservation_expired_producer: Vec<EventProducer<ReservationExpiredEvent>>,
}

impl EventProducers {
    pub async fn publish_payment_settled(&self, event: PaymentSettledEvent) {
        for producer in &self.payment_settled_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_reservation_expired(&self, event: ReservationExpiredEvent) {
        for producer in &self.reservation_expired_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_payment_settled: Option<EventHandler<PaymentSettledEvent>>,
    pub on_reservation_expired: Option<EventHandler<ReservationExpiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_settled = hooks.on_payment_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_reservation_expired = hooks.on_reservation_expired.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_settled, on_reservation_expired }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_settled {
            result.payment_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_reservation_expired {
            result.reservation_expired_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_settled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_reservation_expired {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_settled: Option<Handler<PaymentSettledEvent>>,
    pub on_reservation_expired: Option<Handler<ReservationExpiredEvent>>,
}

impl EventHooks {
    pub fn on_payment_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_settled = Some(Arc::new(f));
        self
    }

    pub fn on_reservation_expired<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReservationExpiredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_reservation_expired = Some(Arc::new(f));
        self
    }
}
