//! # Event Envelope
//!
//! Typed facts describing order and product state changes, published across
//! the notification pipeline.
//!
//! ## Design Principles
//!
//! 1. **Single source of truth**: one envelope shape for every publisher
//! 2. **Immutability**: an envelope is never mutated after publish; consumers
//!    only derive new records from it
//! 3. **Exhaustiveness**: `EventType` is a closed enum, matched exhaustively
//!    at every consumer boundary
//! 4. **Tracing**: the originating request id rides the envelope end-to-end
//!
//! ## Wire shape
//!
//! Envelopes serialize as JSON text in the message body, with the event type
//! duplicated into the `eventType` message attribute so subscription filters
//! can match without touching the body:
//!
//! ```json
//! {
//!   "eventType": "ORDER_CREATED",
//!   "subjectId": "o1",
//!   "data": {
//!     "email": "a@b.com",
//!     "orderId": "o1",
//!     "shipping": { "type": "ECONOMIC", "carrier": "CORREIOS" },
//!     "billing": { "payment": "CASH", "total": 10.0 },
//!     "productCodes": ["P1"],
//!     "requestId": "r1"
//!   },
//!   "requestId": "r1",
//!   "occurredAt": 1712345678901
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BusMessage, EVENT_TYPE_ATTRIBUTE};

/// The kind of entity an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Order,
    Product,
}

impl EntityKind {
    /// Partition-key prefix segment (`order` / `product`)
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Order => "order",
            EntityKind::Product => "product",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized event types, rendered as SCREAMING_SNAKE_CASE on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    OrderCreated,
    OrderDeleted,
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderCreated => "ORDER_CREATED",
            EventType::OrderDeleted => "ORDER_DELETED",
            EventType::ProductCreated => "PRODUCT_CREATED",
            EventType::ProductUpdated => "PRODUCT_UPDATED",
            EventType::ProductDeleted => "PRODUCT_DELETED",
        }
    }

    /// The entity family this event type belongs to
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            EventType::OrderCreated | EventType::OrderDeleted => EntityKind::Order,
            EventType::ProductCreated | EventType::ProductUpdated | EventType::ProductDeleted => {
                EntityKind::Product
            }
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping details carried on order events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingSummary {
    #[serde(rename = "type")]
    pub kind: String,
    pub carrier: String,
}

/// Billing details carried on order events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSummary {
    pub payment: String,
    pub total: f64,
}

/// Payload for ORDER_* events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEventData {
    pub email: String,
    pub order_id: String,
    pub shipping: ShippingSummary,
    pub billing: BillingSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_codes: Option<Vec<String>>,
    pub request_id: String,
}

/// Payload for PRODUCT_* events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEventData {
    pub product_id: String,
    pub product_code: String,
    pub product_price: f64,
    pub email: String,
}

/// Event-specific payload, one variant per entity family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Order(OrderEventData),
    Product(ProductEventData),
}

/// Envelope validation failures — the caller's fault, never retried
#[derive(Debug, thiserror::Error)]
pub enum MalformedEvent {
    #[error("subjectId must be non-empty")]
    EmptySubjectId,

    #[error("missing or empty required field: {0}")]
    MissingField(&'static str),

    #[error("payload does not match event type {event_type}")]
    PayloadMismatch { event_type: EventType },

    #[error("invalid envelope json: {0}")]
    Json(String),
}

/// An immutable fact describing a single order or product state change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_type: EventType,
    /// Identifier of the order or product the event describes
    pub subject_id: String,
    pub data: EventPayload,
    /// Correlation id of the originating request
    pub request_id: String,
    /// Millisecond epoch, set once at construction
    pub occurred_at: i64,
}

impl EventEnvelope {
    /// Build and validate an envelope, stamping `occurred_at` with the
    /// current time.
    pub fn new(
        event_type: EventType,
        subject_id: impl Into<String>,
        data: EventPayload,
        request_id: impl Into<String>,
    ) -> Result<Self, MalformedEvent> {
        let envelope = Self {
            event_type,
            subject_id: subject_id.into(),
            data,
            request_id: request_id.into(),
            occurred_at: Utc::now().timestamp_millis(),
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// Check that required payload fields for the declared event type are
    /// present and non-empty.
    pub fn validate(&self) -> Result<(), MalformedEvent> {
        if self.subject_id.is_empty() {
            return Err(MalformedEvent::EmptySubjectId);
        }
        if self.request_id.is_empty() {
            return Err(MalformedEvent::MissingField("requestId"));
        }

        match (self.event_type.entity_kind(), &self.data) {
            (EntityKind::Order, EventPayload::Order(data)) => {
                if data.email.is_empty() {
                    return Err(MalformedEvent::MissingField("data.email"));
                }
                if data.order_id.is_empty() {
                    return Err(MalformedEvent::MissingField("data.orderId"));
                }
                if data.shipping.kind.is_empty() || data.shipping.carrier.is_empty() {
                    return Err(MalformedEvent::MissingField("data.shipping"));
                }
                if data.billing.payment.is_empty() {
                    return Err(MalformedEvent::MissingField("data.billing"));
                }
                Ok(())
            }
            (EntityKind::Product, EventPayload::Product(data)) => {
                if data.product_code.is_empty() {
                    return Err(MalformedEvent::MissingField("data.productCode"));
                }
                Ok(())
            }
            _ => Err(MalformedEvent::PayloadMismatch {
                event_type: self.event_type,
            }),
        }
    }

    /// Serialize into a bus message for the given subject, with the event
    /// type attached as a filterable attribute.
    pub fn to_message(&self, subject: &str) -> crate::BusResult<BusMessage> {
        let payload = serde_json::to_vec(self)
            .map_err(|e| crate::BusError::SerializationError(e.to_string()))?;
        Ok(BusMessage::new(subject, payload)
            .with_attribute(EVENT_TYPE_ATTRIBUTE, self.event_type.as_str()))
    }

    /// Parse and validate an envelope out of a delivered bus message
    pub fn from_message(msg: &BusMessage) -> Result<Self, MalformedEvent> {
        let envelope: EventEnvelope = serde_json::from_slice(&msg.payload)
            .map_err(|e| MalformedEvent::Json(e.to_string()))?;
        envelope.validate()?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_data(order_id: &str) -> EventPayload {
        EventPayload::Order(OrderEventData {
            email: "a@b.com".to_string(),
            order_id: order_id.to_string(),
            shipping: ShippingSummary {
                kind: "ECONOMIC".to_string(),
                carrier: "CORREIOS".to_string(),
            },
            billing: BillingSummary {
                payment: "CASH".to_string(),
                total: 10.0,
            },
            product_codes: Some(vec!["P1".to_string()]),
            request_id: "r1".to_string(),
        })
    }

    fn product_data(code: &str) -> EventPayload {
        EventPayload::Product(ProductEventData {
            product_id: "p-id".to_string(),
            product_code: code.to_string(),
            product_price: 9.99,
            email: "admin@b.com".to_string(),
        })
    }

    #[test]
    fn order_envelope_validates() {
        let envelope =
            EventEnvelope::new(EventType::OrderCreated, "o1", order_data("o1"), "r1").unwrap();
        assert_eq!(envelope.event_type, EventType::OrderCreated);
        assert!(envelope.occurred_at > 0);
    }

    #[test]
    fn order_type_rejects_product_payload() {
        let err = EventEnvelope::new(EventType::OrderCreated, "o1", product_data("P1"), "r1")
            .unwrap_err();
        assert!(matches!(err, MalformedEvent::PayloadMismatch { .. }));
    }

    #[test]
    fn product_type_rejects_order_payload() {
        let err = EventEnvelope::new(EventType::ProductDeleted, "P1", order_data("o1"), "r1")
            .unwrap_err();
        assert!(matches!(err, MalformedEvent::PayloadMismatch { .. }));
    }

    #[test]
    fn empty_subject_id_is_rejected() {
        let err = EventEnvelope::new(EventType::OrderCreated, "", order_data("o1"), "r1")
            .unwrap_err();
        assert!(matches!(err, MalformedEvent::EmptySubjectId));
    }

    #[test]
    fn missing_order_fields_are_rejected() {
        let data = EventPayload::Order(OrderEventData {
            email: String::new(),
            order_id: "o1".to_string(),
            shipping: ShippingSummary {
                kind: "URGENT".to_string(),
                carrier: "FEDEX".to_string(),
            },
            billing: BillingSummary {
                payment: "CASH".to_string(),
                total: 1.0,
            },
            product_codes: None,
            request_id: "r1".to_string(),
        });
        let err = EventEnvelope::new(EventType::OrderCreated, "o1", data, "r1").unwrap_err();
        assert!(matches!(err, MalformedEvent::MissingField("data.email")));
    }

    #[test]
    fn wire_shape_uses_camel_case_and_screaming_types() {
        let envelope =
            EventEnvelope::new(EventType::OrderDeleted, "o9", order_data("o9"), "r9").unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&envelope).unwrap()).unwrap();
        assert_eq!(json["eventType"], "ORDER_DELETED");
        assert_eq!(json["subjectId"], "o9");
        assert_eq!(json["data"]["orderId"], "o9");
        assert_eq!(json["data"]["shipping"]["type"], "ECONOMIC");
        assert_eq!(json["data"]["billing"]["payment"], "CASH");
    }

    #[test]
    fn message_round_trip_carries_event_type_attribute() {
        let envelope =
            EventEnvelope::new(EventType::OrderCreated, "o1", order_data("o1"), "r1").unwrap();
        let msg = envelope.to_message("orders.events").unwrap();
        assert_eq!(msg.attribute(EVENT_TYPE_ATTRIBUTE), Some("ORDER_CREATED"));

        let parsed = EventEnvelope::from_message(&msg).unwrap();
        assert_eq!(parsed.subject_id, "o1");
        assert_eq!(parsed.occurred_at, envelope.occurred_at);
        match parsed.data {
            EventPayload::Order(data) => {
                assert_eq!(data.product_codes, Some(vec!["P1".to_string()]))
            }
            EventPayload::Product(_) => panic!("expected order payload"),
        }
    }

    #[test]
    fn garbage_body_is_malformed() {
        let msg = BusMessage::new("orders.events", b"not json".to_vec());
        let err = EventEnvelope::from_message(&msg).unwrap_err();
        assert!(matches!(err, MalformedEvent::Json(_)));
    }
}
