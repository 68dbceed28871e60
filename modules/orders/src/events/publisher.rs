//! ORDER_* event publishing
//!
//! Publishing is decoupled from the request path on purpose: a create or
//! delete response depends solely on the storage outcome, and a publish
//! failure is captured in logs, never awaited by the caller's success path.

use std::sync::Arc;

use event_bus::{
    BillingSummary, BusError, BusResult, EventBus, EventEnvelope, EventPayload, EventType,
    OrderEventData, ShippingSummary,
};

use crate::models::Order;

/// Topic every order fact is published to
pub const ORDER_EVENTS_SUBJECT: &str = "orders.events";

/// Publisher for order lifecycle facts
#[derive(Clone)]
pub struct OrderEventPublisher {
    bus: Arc<dyn EventBus>,
    subject: String,
}

impl OrderEventPublisher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self {
            bus,
            subject: ORDER_EVENTS_SUBJECT.to_string(),
        }
    }

    /// Override the topic (tests publish onto scoped subjects)
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Build the envelope describing one order state change
    pub fn build_envelope(
        event_type: EventType,
        order: &Order,
        request_id: &str,
    ) -> Result<EventEnvelope, event_bus::MalformedEvent> {
        let data = EventPayload::Order(OrderEventData {
            email: order.email.clone(),
            order_id: order.id.clone(),
            shipping: ShippingSummary {
                kind: order.shipping.kind.as_str().to_string(),
                carrier: order.shipping.carrier.as_str().to_string(),
            },
            billing: BillingSummary {
                payment: order.billing.payment.as_str().to_string(),
                total: order.billing.total_price,
            },
            product_codes: Some(order.product_codes()),
            request_id: request_id.to_string(),
        });
        EventEnvelope::new(event_type, order.id.clone(), data, request_id)
    }

    /// Publish one order fact and wait for the bus to accept it
    pub async fn publish(
        &self,
        event_type: EventType,
        order: &Order,
        request_id: &str,
    ) -> BusResult<()> {
        let envelope = Self::build_envelope(event_type, order, request_id)
            .map_err(|e| BusError::SerializationError(e.to_string()))?;
        let message = envelope.to_message(&self.subject)?;
        let message_id = message.message_id.clone();

        self.bus.publish(message).await?;

        tracing::info!(
            event_type = %event_type,
            order_id = %order.id,
            message_id = %message_id,
            request_id,
            "order event published"
        );
        Ok(())
    }

    /// Publish as a detached task. Failures are logged and contained in the
    /// notification pipeline; the caller's response does not depend on them.
    pub fn publish_detached(&self, event_type: EventType, order: Order, request_id: String) {
        let publisher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = publisher.publish(event_type, &order, &request_id).await {
                tracing::error!(
                    event_type = %event_type,
                    order_id = %order.id,
                    request_id = %request_id,
                    error = %e,
                    "failed to publish order event"
                );
            }
        });
    }
}
