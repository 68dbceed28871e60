//! PRODUCT_* event recording
//!
//! Product events take the direct-invoke path: admin mutations hand the
//! envelope straight to the event recorder, no bus hop. Recording is
//! detached from the response path the same way order publishing is —
//! a create/update/delete succeeds or fails on the storage outcome alone.

use event_bus::{EventEnvelope, EventPayload, EventType, ProductEventData};
use event_store::EventRecorder;
use uuid::Uuid;

use crate::models::Product;

/// Build the envelope describing one product state change
pub fn build_envelope(
    event_type: EventType,
    product: &Product,
    email: &str,
    request_id: &str,
) -> Result<EventEnvelope, event_bus::MalformedEvent> {
    let data = EventPayload::Product(ProductEventData {
        product_id: product.id.clone(),
        product_code: product.code.clone(),
        product_price: product.price,
        email: email.to_string(),
    });
    EventEnvelope::new(event_type, product.code.clone(), data, request_id)
}

/// Record a product fact as a detached task; failures are logged, never
/// surfaced to the admin caller.
pub fn record_detached(
    recorder: EventRecorder,
    event_type: EventType,
    product: Product,
    email: String,
    request_id: String,
) {
    tokio::spawn(async move {
        let envelope = match build_envelope(event_type, &product, &email, &request_id) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    event_type = %event_type,
                    product_code = %product.code,
                    error = %e,
                    "refusing to record malformed product event"
                );
                return;
            }
        };

        // Direct invoke: the recorder assigns the delivery id itself
        let message_id = Uuid::new_v4().to_string();
        if let Err(e) = recorder.record(&envelope, &message_id).await {
            tracing::error!(
                event_type = %event_type,
                product_code = %product.code,
                request_id = %request_id,
                error = %e,
                "failed to record product event"
            );
        }
    });
}
