//! Payment listener
//!
//! Pass-through consumer subscribed to ORDER_CREATED only. It has no retry
//! or state logic of its own; it logs what it sees for the payment side.

use event_bus::{EventBus, EventType, SubscriptionFilter, EVENT_TYPE_ATTRIBUTE};
use futures::StreamExt;
use std::sync::Arc;

use crate::events::ORDER_EVENTS_SUBJECT;

/// Start the payment listener task
pub fn start_payment_listener(bus: Arc<dyn EventBus>) {
    tokio::spawn(async move {
        tracing::info!("starting payment listener");

        let filter = SubscriptionFilter::event_types([EventType::OrderCreated.as_str()]);
        let mut stream = match bus.subscribe(ORDER_EVENTS_SUBJECT, filter).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(subject = ORDER_EVENTS_SUBJECT, error = %e, "failed to subscribe");
                return;
            }
        };

        tracing::info!(subject = ORDER_EVENTS_SUBJECT, "subscribed");

        while let Some(msg) = stream.next().await {
            let event_type = msg.attribute(EVENT_TYPE_ATTRIBUTE).unwrap_or("unknown");
            let body = String::from_utf8_lossy(&msg.payload);
            tracing::info!(
                event_type,
                message_id = %msg.message_id,
                message = %body,
                "processing payment event"
            );
        }

        tracing::warn!("payment listener stopped");
    });
}
