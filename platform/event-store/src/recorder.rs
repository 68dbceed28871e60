//! Event recorder: turns delivered envelopes into event store records

use crate::{EventInfo, EventRecord, EventStore, EventStoreError, RECORD_TTL_SECS};
use chrono::Utc;
use event_bus::{EventEnvelope, EventPayload};
use std::sync::Arc;

/// Consumer-side component that persists one record per delivered envelope
///
/// The record timestamp is recorder-assigned at arrival, not taken from the
/// envelope's `occurred_at`: a redelivered envelope recomputes it and may
/// land under a new sort key. The store's last-write-wins append keeps
/// verbatim redeliveries harmless either way.
///
/// Append failures are returned to the caller so the delivering queue or
/// bus can apply its redelivery/backoff policy — they are never swallowed
/// here.
#[derive(Clone)]
pub struct EventRecorder {
    store: Arc<dyn EventStore>,
}

impl EventRecorder {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Build and append the record for one delivered envelope.
    ///
    /// `message_id` is the delivery id of the bus message (or a synthetic
    /// id on the direct-invoke path); it lands in the record's `info` for
    /// order events.
    pub async fn record(
        &self,
        envelope: &EventEnvelope,
        message_id: &str,
    ) -> Result<EventRecord, EventStoreError> {
        let arrival = Utc::now().timestamp_millis();
        let event_type = envelope.event_type.as_str();

        let (email, info) = match &envelope.data {
            EventPayload::Order(data) => (
                data.email.clone(),
                EventInfo::Order {
                    order_id: data.order_id.clone(),
                    product_codes: data.product_codes.clone(),
                    message_id: message_id.to_string(),
                },
            ),
            EventPayload::Product(data) => (
                data.email.clone(),
                EventInfo::Product {
                    product_id: data.product_id.clone(),
                    product_price: data.product_price,
                },
            ),
        };

        let record = EventRecord {
            pk: EventRecord::partition_key(
                envelope.event_type.entity_kind(),
                &envelope.subject_id,
            ),
            sk: EventRecord::sort_key(event_type, arrival),
            ttl: arrival / 1000 + RECORD_TTL_SECS,
            email,
            created_at: arrival,
            request_id: envelope.request_id.clone(),
            event_type: event_type.to_string(),
            info,
        };

        tracing::info!(
            event_type,
            subject_id = %envelope.subject_id,
            message_id,
            request_id = %envelope.request_id,
            "recording event"
        );

        self.store.append(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryEventStore;
    use async_trait::async_trait;
    use event_bus::{
        BillingSummary, EntityKind, EventType, OrderEventData, ProductEventData, ShippingSummary,
    };

    fn order_envelope(order_id: &str) -> EventEnvelope {
        EventEnvelope::new(
            EventType::OrderCreated,
            order_id,
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
            }),
            "r1",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn records_order_envelope_under_entity_partition() {
        let store = Arc::new(InMemoryEventStore::new());
        let recorder = EventRecorder::new(store.clone());

        let record = recorder.record(&order_envelope("o1"), "msg-1").await.unwrap();

        assert_eq!(record.pk, "#order_o1");
        assert!(record.sk.starts_with("ORDER_CREATED#"));
        assert_eq!(record.ttl, record.created_at / 1000 + RECORD_TTL_SECS);
        assert_eq!(record.email, "a@b.com");
        match &record.info {
            EventInfo::Order {
                order_id,
                product_codes,
                message_id,
            } => {
                assert_eq!(order_id, "o1");
                assert_eq!(product_codes.as_deref(), Some(["P1".to_string()].as_slice()));
                assert_eq!(message_id, "msg-1");
            }
            EventInfo::Product { .. } => panic!("expected order info"),
        }

        let history = store.query_by_entity(EntityKind::Order, "o1").await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn records_product_envelope_with_price_info() {
        let store = Arc::new(InMemoryEventStore::new());
        let recorder = EventRecorder::new(store.clone());

        let envelope = EventEnvelope::new(
            EventType::ProductCreated,
            "P1",
            EventPayload::Product(ProductEventData {
                product_id: "id-1".to_string(),
                product_code: "P1".to_string(),
                product_price: 25.5,
                email: "admin@b.com".to_string(),
            }),
            "r2",
        )
        .unwrap();

        let record = recorder.record(&envelope, "msg-2").await.unwrap();
        assert_eq!(record.pk, "#product_P1");
        assert!(record.sk.starts_with("PRODUCT_CREATED#"));
        match record.info {
            EventInfo::Product { product_price, .. } => assert_eq!(product_price, 25.5),
            EventInfo::Order { .. } => panic!("expected product info"),
        }
    }

    struct DownStore;

    #[async_trait]
    impl EventStore for DownStore {
        async fn append(&self, _record: EventRecord) -> Result<EventRecord, EventStoreError> {
            Err(EventStoreError::Unavailable("connection refused".to_string()))
        }

        async fn query_by_entity(
            &self,
            _kind: EntityKind,
            _subject_id: &str,
        ) -> Result<Vec<EventRecord>, EventStoreError> {
            Err(EventStoreError::Unavailable("connection refused".to_string()))
        }

        async fn query_by_customer(
            &self,
            _email: &str,
            _event_type_prefix: Option<&str>,
        ) -> Result<Vec<EventRecord>, EventStoreError> {
            Err(EventStoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn append_failure_propagates_to_caller() {
        let recorder = EventRecorder::new(Arc::new(DownStore));
        let err = recorder.record(&order_envelope("o1"), "msg-1").await.unwrap_err();
        assert!(matches!(err, EventStoreError::Unavailable(_)));
    }
}
